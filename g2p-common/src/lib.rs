//! # G2P Hermes Common Library
//!
//! Shared code for the Hermes G2P service:
//! - Hermes message payload types
//! - Topic grammar (parsing and construction)
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod messages;
pub mod topic;

pub use error::{Error, Result};
