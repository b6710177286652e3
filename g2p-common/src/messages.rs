//! Payload types for `hermes/g2p` messages
//!
//! Field names on the wire follow the Hermes JSON convention (camelCase).
//! Decoding is lenient: absent fields fall back to defaults so that
//! incomplete payloads surface as validation failures, not decode failures.

use serde::{Deserialize, Serialize};

/// Get phonetic pronunciations for words.
///
/// Inbound on `hermes/g2p/<siteId>/pronounce`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pPronounce {
    /// Correlation id echoed verbatim in the response
    #[serde(default)]
    pub request_id: String,

    /// Grapheme forms to convert
    #[serde(default)]
    pub words: Vec<String>,

    /// Originating site id (the topic segment wins when this is empty)
    #[serde(default)]
    pub site_id: String,

    /// Hermes session id, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Maximum candidate pronunciations per word
    #[serde(default = "default_num_guesses")]
    pub num_guesses: u32,
}

fn default_num_guesses() -> u32 {
    5
}

/// One ranked pronunciation entry for a single word.
///
/// Entries for the same word appear consecutively in rank order. A word
/// that produced no candidates still appears once, with empty `phonemes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pPronunciation {
    /// Word as spelled in the request
    pub word: String,

    /// Phoneme symbols, best hypothesis first within the word's group
    pub phonemes: Vec<String>,

    /// False only when the pronunciation came from a dictionary entry
    pub guessed: bool,

    /// Backend rank weight, lower is better; 0.0 for dictionary entries
    pub score: f64,
}

/// Phonetic pronunciations for the words of one request.
///
/// Outbound on `hermes/g2p/<siteId>/pronunciation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pPhonemes {
    /// Correlation id from the request
    pub request_id: String,

    /// Site id from the request
    pub site_id: String,

    /// Session id from the request, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Per-candidate result entries, grouped by word
    pub results: Vec<G2pPronunciation>,
}

/// Error from the G2P component.
///
/// Outbound on `hermes/error/g2p`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pError {
    /// Correlation id from the request (may be empty for undecodable payloads)
    pub request_id: String,

    /// Site id from the request or topic
    pub site_id: String,

    /// Session id from the request, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Error class and human-readable detail
    pub error: String,

    /// Requested words, comma-joined
    #[serde(default)]
    pub context: String,
}
