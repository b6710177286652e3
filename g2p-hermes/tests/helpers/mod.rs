//! Shared stubs for G2P service tests
#![allow(dead_code)]

use async_trait::async_trait;
use g2p_hermes::backend::{BackendError, G2pBackend, PhoneticCandidate};
use g2p_hermes::transport::Publisher;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted per-word backend behavior.
pub enum WordBehavior {
    /// Return these candidates
    Candidates(Vec<PhoneticCandidate>),
    /// Report a per-word timeout
    Timeout,
    /// Fail with a generic engine error
    Fail,
    /// Fail the first attempt, then return these candidates
    FailThenSucceed(Vec<PhoneticCandidate>),
    /// Report the engine unavailable
    Unavailable,
    /// Sleep past any reasonable deadline
    Hang,
}

/// Backend stub with scripted per-word behavior and a call counter.
///
/// Words without a scripted behavior return no candidates.
#[derive(Default)]
pub struct StubBackend {
    behaviors: HashMap<String, WordBehavior>,
    calls: AtomicUsize,
    attempts: Mutex<HashMap<String, usize>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, word: &str, behavior: WordBehavior) -> Self {
        self.behaviors.insert(word.to_string(), behavior);
        self
    }

    /// Total adapter calls across all words, retries included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl G2pBackend for StubBackend {
    async fn convert(
        &self,
        word: &str,
        _num_guesses: u32,
        timeout: Duration,
    ) -> Result<Vec<PhoneticCandidate>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(word.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        match self.behaviors.get(word) {
            Some(WordBehavior::Candidates(candidates)) => Ok(candidates.clone()),
            Some(WordBehavior::Timeout) => Err(BackendError::Timeout(timeout)),
            Some(WordBehavior::Fail) => {
                Err(BackendError::Failed("scripted failure".to_string()))
            }
            Some(WordBehavior::FailThenSucceed(candidates)) => {
                if attempt == 1 {
                    Err(BackendError::Failed("scripted first failure".to_string()))
                } else {
                    Ok(candidates.clone())
                }
            }
            Some(WordBehavior::Unavailable) => {
                Err(BackendError::Unavailable("scripted outage".to_string()))
            }
            Some(WordBehavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Publisher stub capturing outgoing messages.
#[derive(Default)]
pub struct CapturePublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl CapturePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for CapturePublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> g2p_common::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

/// Candidate constructor shorthand.
pub fn candidate(word: &str, phonemes: &[&str], score: f64) -> PhoneticCandidate {
    PhoneticCandidate {
        word: word.to_string(),
        phonemes: phonemes.iter().map(|p| p.to_string()).collect(),
        score,
    }
}
