//! Verifier configuration
//!
//! Loaded from JSON by the driver; every field has a default so partial
//! files are accepted.

use gel_common::IrError;
use serde::{Deserialize, Serialize};

/// Policy knobs for `verify_with`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Report warnings as errors
    pub deny_warnings: bool,
    /// Keep at most this many findings (0 keeps all)
    pub max_findings: usize,
    /// Report blocks unreachable from the entry block
    pub check_reachability: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            deny_warnings: false,
            max_findings: 0,
            check_reachability: true,
        }
    }
}

impl VerifierConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, IrError> {
        serde_json::from_str(text).map_err(|e| IrError::Serialization { message: e.to_string() })
    }
}
