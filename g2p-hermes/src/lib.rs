//! # Hermes G2P Service
//!
//! MQTT service answering `hermes/g2p/<siteId>/pronounce` requests with
//! phonetic pronunciations. Known words resolve from a pronunciation
//! dictionary; the rest are guessed by an external G2P engine behind a
//! bounded-concurrency adapter. Every accepted request resolves to exactly
//! one outgoing message, success or error.

pub mod assembler;
pub mod backend;
pub mod dictionary;
pub mod handler;
pub mod service;
pub mod transport;
