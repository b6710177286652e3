//! Outgoing message assembly
//!
//! Turns a handler outcome into the topic/payload pair for the transport.
//! Payloads are schema-complete regardless of how many words succeeded:
//! `requestId` and `siteId` are always present, and every requested word
//! appears in a success payload at least once.

use crate::handler::{ErrorKind, Outcome, WordResult};
use g2p_common::messages::{G2pError, G2pPhonemes, G2pPronunciation};
use g2p_common::{topic, Result};

/// A ready-to-publish topic/payload pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Correlation identifiers echoed on every outgoing message.
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub site_id: String,
    pub session_id: Option<String>,
}

/// Build the single terminal message for a request.
///
/// `words` carries the original request words for error context.
pub fn assemble(ids: &RequestIds, outcome: &Outcome, words: &[String]) -> Result<WireMessage> {
    match outcome {
        Outcome::Resolved(results) => {
            let payload = G2pPhonemes {
                request_id: ids.request_id.clone(),
                site_id: ids.site_id.clone(),
                session_id: ids.session_id.clone(),
                results: flatten_results(results),
            };
            Ok(WireMessage {
                topic: topic::pronunciation_topic(&ids.site_id),
                payload: serde_json::to_vec(&payload)?,
            })
        }
        Outcome::Error { kind, message } => Ok(error_message(ids, *kind, message, words)?),
    }
}

/// Build an error message directly, used for payloads that never reached
/// the handler (undecodable JSON).
pub fn error_message(
    ids: &RequestIds,
    kind: ErrorKind,
    message: &str,
    words: &[String],
) -> Result<WireMessage> {
    let payload = G2pError {
        request_id: ids.request_id.clone(),
        site_id: ids.site_id.clone(),
        session_id: ids.session_id.clone(),
        error: format!("{kind}: {message}"),
        context: words.join(","),
    };
    Ok(WireMessage {
        topic: topic::ERROR_TOPIC.to_string(),
        payload: serde_json::to_vec(&payload)?,
    })
}

/// Flatten per-word results into wire entries, rank order within each word.
///
/// A word with no surviving candidates contributes one entry with empty
/// `phonemes` so the word's fate stays visible to the client.
fn flatten_results(results: &[WordResult]) -> Vec<G2pPronunciation> {
    let mut entries = Vec::new();

    for result in results {
        if result.candidates.is_empty() {
            entries.push(G2pPronunciation {
                word: result.word.clone(),
                phonemes: Vec::new(),
                guessed: result.guessed,
                score: 0.0,
            });
            continue;
        }

        for candidate in &result.candidates {
            entries.push(G2pPronunciation {
                word: result.word.clone(),
                phonemes: candidate.phonemes.clone(),
                guessed: result.guessed,
                score: candidate.score,
            });
        }
    }

    entries
}
