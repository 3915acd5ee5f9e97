use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::binary::{MAX_TEXT_SIZE, SNIFF_LEN};
use crate::error::DiffResult;

/// Configuration for patch building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Transcode non-UTF-8 text to UTF-8 before diffing.
    pub transcode_to_canonical: bool,
    /// Content larger than this many bytes is treated as binary.
    pub max_text_size: u64,
    /// Leading bytes scanned for NUL during binary detection.
    pub sniff_len: usize,
    /// Deadline for a single file's diff, in milliseconds. Past it the engine
    /// returns a valid but possibly non-minimal script.
    pub diff_timeout_ms: Option<u64>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            transcode_to_canonical: false,
            max_text_size: MAX_TEXT_SIZE,
            sniff_len: SNIFF_LEN,
            diff_timeout_ms: None,
        }
    }
}

impl PatchConfig {
    /// Parse from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> DiffResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn diff_timeout(&self) -> Option<Duration> {
        self.diff_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;

    #[test]
    fn default_config() {
        let c = PatchConfig::default();
        assert!(!c.transcode_to_canonical);
        assert_eq!(c.max_text_size, 50 * 1024 * 1024);
        assert_eq!(c.sniff_len, 8000);
        assert!(c.diff_timeout().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = PatchConfig::from_toml_str(
            "transcode_to_canonical = true\ndiff_timeout_ms = 250\n",
        )
        .unwrap();
        assert!(c.transcode_to_canonical);
        assert_eq!(c.diff_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(c.max_text_size, MAX_TEXT_SIZE);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = PatchConfig::from_toml_str("max_text_size = \"big\"").unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));
    }
}
