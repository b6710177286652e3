//! G2P backend adapter
//!
//! Encapsulates all interaction with the external G2P engine. The engine is
//! a phonetisaurus-style command-line tool: given a word and a model, it
//! prints ranked phoneme-sequence hypotheses, one per line. The adapter
//! enforces the call timeout (killing the process on expiry), caps
//! simultaneous invocations, and normalizes every failure mode into
//! [`BackendError`] so the handler never inspects engine-specific detail.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

/// Backend adapter errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Engine call exceeded the per-word timeout
    #[error("G2P engine timed out after {0:?}")]
    Timeout(Duration),

    /// Engine binary or model missing/unreachable
    #[error("G2P engine unavailable: {0}")]
    Unavailable(String),

    /// Engine ran but exited with an error
    #[error("G2P engine failed: {0}")]
    Failed(String),

    /// Engine produced output we could not parse
    #[error("Malformed G2P engine output: {0}")]
    Malformed(String),
}

/// One ranked phoneme-sequence hypothesis for a word.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneticCandidate {
    /// Word as spelled in the request
    pub word: String,
    /// Phoneme symbols in pronunciation order
    pub phonemes: Vec<String>,
    /// Rank weight, lower is better; 0.0 for dictionary entries
    pub score: f64,
}

/// Interface to the G2P engine.
///
/// The timeout is enforced by the implementation, not the engine; on expiry
/// the call must return [`BackendError::Timeout`] and release any resources
/// it holds.
#[async_trait]
pub trait G2pBackend: Send + Sync {
    /// Guess up to `num_guesses` ranked pronunciations for `word`.
    async fn convert(
        &self,
        word: &str,
        num_guesses: u32,
        timeout: Duration,
    ) -> Result<Vec<PhoneticCandidate>, BackendError>;
}

/// Phonetisaurus subprocess backend.
///
/// Invokes `<binary> --model <model> --word <word> --nbest <n>` per call.
/// A semaphore caps simultaneous invocations so request fan-out cannot
/// overwhelm the engine; excess calls queue on the permit.
pub struct PhonetisaurusBackend {
    binary: PathBuf,
    model: PathBuf,
    permits: Arc<Semaphore>,
}

impl PhonetisaurusBackend {
    /// Create a new backend around an engine binary and model file.
    pub fn new(binary: PathBuf, model: PathBuf, max_concurrent_calls: usize) -> Self {
        Self {
            binary,
            model,
            permits: Arc::new(Semaphore::new(max_concurrent_calls)),
        }
    }

    /// Probe the engine once, at startup.
    ///
    /// Verifies the model file exists and the binary can be spawned. A
    /// failing probe is reported but not fatal for the service: requests
    /// will resolve to error responses until the engine is repaired.
    pub async fn check_available(&self) -> Result<(), BackendError> {
        if !self.model.exists() {
            return Err(BackendError::Unavailable(format!(
                "model not found: {}",
                self.model.display()
            )));
        }

        match Command::new(&self.binary)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                BackendError::Unavailable(format!("binary not found: {}", self.binary.display())),
            ),
            Err(e) => Err(BackendError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl G2pBackend for PhonetisaurusBackend {
    async fn convert(
        &self,
        word: &str,
        num_guesses: u32,
        timeout: Duration,
    ) -> Result<Vec<PhoneticCandidate>, BackendError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BackendError::Unavailable("engine gate closed".to_string()))?;

        if !self.model.exists() {
            return Err(BackendError::Unavailable(format!(
                "model not found: {}",
                self.model.display()
            )));
        }

        debug!(word, num_guesses, binary = %self.binary.display(), "Invoking G2P engine");

        let child = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.model)
            .arg("--word")
            .arg(word)
            .arg("--nbest")
            .arg(num_guesses.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BackendError::Unavailable(format!(
                    "binary not found: {}",
                    self.binary.display()
                )),
                _ => BackendError::Unavailable(e.to_string()),
            })?;

        // kill_on_drop reaps the process when the timeout drops the future
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| BackendError::Failed(e.to_string()))?,
            Err(_) => return Err(BackendError::Timeout(timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Failed(format!(
                "exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_engine_output(word, &stdout)
    }
}

/// Stand-in backend for deployments without a configured model.
///
/// Every guess reports the engine unavailable, so dictionary-only setups
/// still answer dictionary words and fail guessed ones explicitly.
pub struct UnconfiguredBackend;

#[async_trait]
impl G2pBackend for UnconfiguredBackend {
    async fn convert(
        &self,
        _word: &str,
        _num_guesses: u32,
        _timeout: Duration,
    ) -> Result<Vec<PhoneticCandidate>, BackendError> {
        Err(BackendError::Unavailable(
            "no G2P model configured".to_string(),
        ))
    }
}

/// Parse engine output lines into ranked candidates.
///
/// Expected line shape: `word [score] P1 P2 ...`, best hypothesis first.
/// A numeric second column is taken as the model score; without one, the
/// line's position stands in so ranking order survives either way.
pub fn parse_engine_output(
    word: &str,
    stdout: &str,
) -> Result<Vec<PhoneticCandidate>, BackendError> {
    let mut candidates = Vec::new();

    for (rank, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(BackendError::Malformed(format!(
                "expected `word [score] phonemes...`, got: {line}"
            )));
        }

        let rest = &fields[1..];
        let (score, phonemes) = match rest[0].parse::<f64>() {
            Ok(score) if rest.len() > 1 => {
                (score, rest[1..].iter().map(|s| s.to_string()).collect())
            }
            _ => (
                rank as f64,
                rest.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            ),
        };

        candidates.push(PhoneticCandidate {
            word: word.to_string(),
            phonemes,
            score,
        });
    }

    Ok(candidates)
}
