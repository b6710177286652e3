//! Hermes topic grammar
//!
//! Parses inbound topic strings and builds outbound ones. Matching is
//! case-sensitive with an exact segment count per template; anything that
//! does not match a known template is rejected, never fatal.

use thiserror::Error;

/// MQTT subscription filter covering all inbound request topics
pub const PRONOUNCE_FILTER: &str = "hermes/g2p/+/pronounce";

/// Topic for request-level errors, shared across sites
pub const ERROR_TOPIC: &str = "hermes/error/g2p";

/// Topic routing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopicError {
    /// Topic matched no known template
    #[error("unrecognized topic: {0}")]
    Unrecognized(String),

    /// Template matched but the site segment was empty
    #[error("empty site id in topic: {0}")]
    EmptySiteId(String),
}

/// A successfully parsed inbound topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTopic {
    /// `hermes/g2p/<siteId>/pronounce`
    Pronounce {
        /// Site id extracted from the topic
        site_id: String,
    },
}

/// Parse an inbound topic string against the known templates.
pub fn route(topic: &str) -> Result<ParsedTopic, TopicError> {
    let segments: Vec<&str> = topic.split('/').collect();
    match segments.as_slice() {
        ["hermes", "g2p", site_id, "pronounce"] => {
            if site_id.is_empty() {
                return Err(TopicError::EmptySiteId(topic.to_string()));
            }
            Ok(ParsedTopic::Pronounce {
                site_id: (*site_id).to_string(),
            })
        }
        _ => Err(TopicError::Unrecognized(topic.to_string())),
    }
}

/// Topic carrying successful pronunciations for `site_id`.
pub fn pronunciation_topic(site_id: &str) -> String {
    format!("hermes/g2p/{site_id}/pronunciation")
}
