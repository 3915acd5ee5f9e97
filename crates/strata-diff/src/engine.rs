//! Contract for the character-level diff algorithm.
//!
//! The patch builder hands an engine two pseudo-texts (one scalar per line)
//! and reads back ordered equal/insert/delete runs. Any algorithm producing a
//! valid edit script works; [`MyersDiff`] delegates to `similar`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// Edit operation of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Equal,
    Insert,
    Delete,
}

/// A run of consecutive characters sharing one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub op: Operation,
    pub text: String,
}

impl Edit {
    pub fn new(op: Operation, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }
}

/// Computes an edit script between two texts, character by character.
///
/// Applying the `Equal` and `Insert` runs in order must rebuild `new`; the
/// `Equal` and `Delete` runs must rebuild `old`.
pub trait DiffEngine: Send + Sync {
    fn diff(&self, old: &str, new: &str) -> Vec<Edit>;
}

/// Myers diff from the `similar` crate.
///
/// With a timeout the result is still a valid edit script, just not
/// necessarily a minimal one.
#[derive(Clone, Debug, Default)]
pub struct MyersDiff {
    timeout: Option<Duration>,
}

impl MyersDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl DiffEngine for MyersDiff {
    fn diff(&self, old: &str, new: &str) -> Vec<Edit> {
        let mut config = TextDiff::configure();
        config.algorithm(Algorithm::Myers);
        if let Some(timeout) = self.timeout {
            config.timeout(timeout);
        }
        let diff = config.diff_chars(old, new);

        let mut edits: Vec<Edit> = Vec::new();
        for change in diff.iter_all_changes() {
            let op = match change.tag() {
                ChangeTag::Equal => Operation::Equal,
                ChangeTag::Delete => Operation::Delete,
                ChangeTag::Insert => Operation::Insert,
            };
            match edits.last_mut() {
                Some(last) if last.op == op => last.text.push_str(change.value()),
                _ => edits.push(Edit::new(op, change.value())),
            }
        }
        edits
    }
}
