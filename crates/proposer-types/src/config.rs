//! Global configuration types for Proposer.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! attachment download retries, per-catalog completion behavior, and the
//! document template.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogKind, CompletionAction};

/// Top-level configuration for Proposer.
///
/// Loaded from `~/.proposer/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Extra attempts after a failed attachment download before the user is notified.
    #[serde(default = "default_attachment_retries")]
    pub attachment_retries: u32,

    /// Per-attempt timeout for remote attachment downloads, in seconds.
    #[serde(default = "default_attachment_timeout_secs")]
    pub attachment_timeout_secs: u64,

    /// Largest attachment accepted, in bytes.
    #[serde(default = "default_attachment_max_bytes")]
    pub attachment_max_bytes: u64,

    /// Per-catalog override of the completion action, e.g. `add_info = "overview"`.
    #[serde(default)]
    pub completion: BTreeMap<CatalogKind, CompletionAction>,

    #[serde(default)]
    pub document: DocumentConfig,
}

fn default_attachment_retries() -> u32 {
    1
}

fn default_attachment_timeout_secs() -> u64 {
    30
}

fn default_attachment_max_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            attachment_retries: default_attachment_retries(),
            attachment_timeout_secs: default_attachment_timeout_secs(),
            attachment_max_bytes: default_attachment_max_bytes(),
            completion: BTreeMap::new(),
            document: DocumentConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Completion action for `kind`: the configured override or the kind's default.
    pub fn completion_for(&self, kind: CatalogKind) -> CompletionAction {
        self.completion
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_completion())
    }
}

/// Document rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Handlebars template replacing the built-in one.
    #[serde(default)]
    pub template: Option<PathBuf>,
}
