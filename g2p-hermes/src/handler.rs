//! G2P request handling
//!
//! The core of the service: validates each request, resolves words from the
//! pronunciation dictionary, fans the rest out to the backend concurrently,
//! and reduces everything to a single terminal outcome. Per-word failures
//! degrade to empty results; only a globally unavailable backend or an
//! invalid request fails the whole request.

use crate::backend::{BackendError, G2pBackend, PhoneticCandidate};
use crate::dictionary::PronunciationDictionary;
use g2p_common::messages::G2pPronounce;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Error classes reported on the error topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete inbound payload
    InvalidRequest,
    /// Engine binary/model missing or unreachable
    BackendUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidRequest => write!(f, "invalidRequest"),
            ErrorKind::BackendUnavailable => write!(f, "backendUnavailable"),
        }
    }
}

/// Resolved pronunciations for one requested word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordResult {
    /// Word as spelled in the request
    pub word: String,
    /// Ranked candidates, possibly empty after timeouts/failures
    pub candidates: Vec<PhoneticCandidate>,
    /// False only when the word resolved from the dictionary
    pub guessed: bool,
}

impl WordResult {
    fn empty(word: String) -> Self {
        Self {
            word,
            candidates: Vec::new(),
            guessed: true,
        }
    }
}

/// Terminal outcome of one request: per-word results or one request-level
/// error, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(Vec<WordResult>),
    Error { kind: ErrorKind, message: String },
}

/// Request handler, shared across all in-flight requests.
pub struct RequestHandler {
    backend: Arc<dyn G2pBackend>,
    dictionary: Arc<PronunciationDictionary>,
    per_word_timeout: Duration,
    request_timeout: Duration,
}

impl RequestHandler {
    pub fn new(
        backend: Arc<dyn G2pBackend>,
        dictionary: Arc<PronunciationDictionary>,
        per_word_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            dictionary,
            per_word_timeout,
            request_timeout,
        }
    }

    /// Resolve one request to its terminal outcome.
    ///
    /// Guessed words run concurrently, one task per word, joined before
    /// returning; no task outlives this call. The request ceiling aborts
    /// stragglers and fills their slots with empty results, so the request
    /// always resolves.
    pub async fn handle(&self, request: &G2pPronounce) -> Outcome {
        if let Err(message) = validate(request) {
            debug!(request_id = %request.request_id, %message, "Rejecting invalid request");
            return Outcome::Error {
                kind: ErrorKind::InvalidRequest,
                message,
            };
        }

        let limit = request.num_guesses as usize;

        // Dictionary words resolve locally; the rest fan out to the backend.
        // Repeated words in one request are processed once.
        let mut order: Vec<String> = Vec::with_capacity(request.words.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut resolved: HashMap<String, WordResult> = HashMap::new();
        let mut pending: Vec<String> = Vec::new();

        for word in &request.words {
            if !seen.insert(word.as_str()) {
                continue;
            }
            order.push(word.clone());

            match self.dictionary.lookup(word) {
                Some(pronunciations) => {
                    resolved.insert(word.clone(), dictionary_result(word, pronunciations, limit));
                }
                None => pending.push(word.clone()),
            }
        }

        let mut tasks = JoinSet::new();
        for word in pending {
            let backend = Arc::clone(&self.backend);
            let num_guesses = request.num_guesses;
            let timeout = self.per_word_timeout;
            tasks.spawn(async move {
                let outcome = guess_word(backend.as_ref(), &word, num_guesses, timeout).await;
                (word, outcome)
            });
        }

        let deadline = tokio::time::sleep(self.request_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    match joined {
                        None => break,
                        Some(Ok((word, Ok(candidates)))) => {
                            resolved.insert(
                                word.clone(),
                                WordResult { word, candidates, guessed: true },
                            );
                        }
                        Some(Ok((word, Err(message)))) => {
                            warn!(
                                request_id = %request.request_id,
                                %word,
                                %message,
                                "Backend unavailable, failing request"
                            );
                            tasks.abort_all();
                            return Outcome::Error {
                                kind: ErrorKind::BackendUnavailable,
                                message,
                            };
                        }
                        Some(Err(join_error)) => {
                            // The word task died; its slot fills with an
                            // empty result below.
                            warn!(
                                request_id = %request.request_id,
                                error = %join_error,
                                "Word task failed to join"
                            );
                        }
                    }
                }
                _ = &mut deadline => {
                    warn!(
                        request_id = %request.request_id,
                        timeout_ms = self.request_timeout.as_millis() as u64,
                        "Request ceiling reached, aborting remaining word tasks"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let results = order
            .into_iter()
            .map(|word| {
                resolved
                    .remove(&word)
                    .unwrap_or_else(|| WordResult::empty(word))
            })
            .collect();

        Outcome::Resolved(results)
    }
}

/// Request validation; failures never reach the backend.
fn validate(request: &G2pPronounce) -> Result<(), String> {
    if request.request_id.is_empty() {
        return Err("missing requestId".to_string());
    }
    if request.words.is_empty() {
        return Err("no words to pronounce".to_string());
    }
    if request.words.iter().any(|word| word.trim().is_empty()) {
        return Err("empty word in request".to_string());
    }
    if request.num_guesses == 0 {
        return Err("numGuesses must be at least 1".to_string());
    }
    Ok(())
}

/// One adapter call with a single retry on failure.
///
/// Timeouts and engine failures degrade to an empty candidate list after
/// the retry; an unavailable engine is decisive and returned as `Err` so
/// the whole request can fail.
async fn guess_word(
    backend: &dyn G2pBackend,
    word: &str,
    num_guesses: u32,
    timeout: Duration,
) -> Result<Vec<PhoneticCandidate>, String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match backend.convert(word, num_guesses, timeout).await {
            Ok(candidates) => return Ok(dedup_truncate(candidates, num_guesses as usize)),
            Err(BackendError::Unavailable(message)) => return Err(message),
            Err(error) if attempt == 1 => {
                debug!(word, %error, "Backend call failed, retrying");
            }
            Err(error) => {
                warn!(word, %error, "Backend call failed after retry, returning empty result");
                return Ok(Vec::new());
            }
        }
    }
}

/// Keep the best-ranked occurrence of each distinct phoneme sequence,
/// preserving backend order, truncated to `limit`.
fn dedup_truncate(candidates: Vec<PhoneticCandidate>, limit: usize) -> Vec<PhoneticCandidate> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut kept = Vec::new();

    for candidate in candidates {
        if kept.len() == limit {
            break;
        }
        if seen.insert(candidate.phonemes.clone()) {
            kept.push(candidate);
        }
    }

    kept
}

/// Build a word result from dictionary pronunciations.
fn dictionary_result(word: &str, pronunciations: &[Vec<String>], limit: usize) -> WordResult {
    let candidates = pronunciations
        .iter()
        .map(|phonemes| PhoneticCandidate {
            word: word.to_string(),
            phonemes: phonemes.clone(),
            score: 0.0,
        })
        .collect();

    WordResult {
        word: word.to_string(),
        candidates: dedup_truncate(candidates, limit),
        guessed: false,
    }
}
