use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Invalid URL: {0}")]
    UrlParse(String),

    #[error("Unsupported scheme for {0}")]
    UnsupportedScheme(String),

    /// Not a failure: the resource is stored but its links are not followed.
    #[error("{url} is outside base domain {base_domain}")]
    OutOfDomain { url: String, base_domain: String },

    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Cannot decode {url} as UTF-8 text")]
    Decode { url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error at {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Crawl budget exhausted: {0}")]
    Budget(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl MirrorError {
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Store {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should be counted against the run.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            MirrorError::OutOfDomain { .. }
                | MirrorError::UnsupportedScheme(_)
                | MirrorError::Budget(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
