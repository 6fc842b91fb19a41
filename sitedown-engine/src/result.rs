use crate::kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terminal state of a dispatched URL within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Saved,
    SkippedExisting,
    Failed,
    /// Never fetched: unsupported scheme, malformed link or budget exhausted.
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Saved => "saved",
            Outcome::SkippedExisting => "skipped_existing",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorResult {
    pub url: String,
    pub kind: Option<ResourceKind>,
    pub outcome: Outcome,
    pub local_path: Option<PathBuf>,
    pub status: Option<u16>,
    /// Bytes written to disk (zero when nothing was written).
    pub bytes: u64,
    pub links_found: usize,
    pub content_type: Option<String>,
    pub in_domain: bool,
    /// HTML page reloaded from an earlier run instead of the network.
    pub from_disk: bool,
    pub depth: usize,
    pub error: Option<String>,
}

impl MirrorResult {
    pub fn new(url: String, outcome: Outcome) -> Self {
        Self {
            url,
            kind: None,
            outcome,
            local_path: None,
            status: None,
            bytes: 0,
            links_found: 0,
            content_type: None,
            in_domain: false,
            from_disk: false,
            depth: 0,
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url, Outcome::Failed)
        }
    }

    pub fn skipped(url: String, reason: String) -> Self {
        Self {
            error: Some(reason),
            ..Self::new(url, Outcome::Skipped)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}
