//! Pronunciation dictionary lookup
//!
//! Loads plain-text dictionaries of `word P1 P2 ...` lines (CMUdict-style).
//! Words found here are answered without an engine call and marked as not
//! guessed. Lookup is exact and case-sensitive.

use g2p_common::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// In-memory pronunciation dictionary.
///
/// Multiple pronunciations per word are kept in file order; alternate
/// entries written as `word(2)` fold onto the base word.
#[derive(Debug, Default)]
pub struct PronunciationDictionary {
    entries: HashMap<String, Vec<Vec<String>>>,
}

impl PronunciationDictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entries from a dictionary file, merging with existing ones.
    ///
    /// Blank lines and `;;` comment lines are skipped; lines without
    /// phonemes are skipped with a warning. Returns the number of
    /// pronunciations added.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut added = 0;

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(";;") {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(mut word) = fields.next() else {
                continue;
            };

            // `word(2)` alternate-pronunciation suffix
            if let Some(paren) = word.find('(') {
                if paren > 0 {
                    word = &word[..paren];
                }
            }

            let phonemes: Vec<String> = fields.map(str::to_string).collect();
            if phonemes.is_empty() {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    "Skipping dictionary line with no phonemes"
                );
                continue;
            }

            self.entries
                .entry(word.to_string())
                .or_default()
                .push(phonemes);
            added += 1;
        }

        debug!(path = %path.display(), added, "Loaded pronunciation dictionary");
        Ok(added)
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, word: &str) -> Option<&[Vec<String>]> {
        self.entries.get(word).map(Vec::as_slice)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
