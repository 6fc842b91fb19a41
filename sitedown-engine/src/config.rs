use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_ROOT: &str = "downloads";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Settings for one mirroring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub base_url: String,
    /// Host (optionally `host:port`) whose HTML pages are traversed.
    /// Derived from `base_url` when unset.
    pub base_domain: Option<String>,
    pub root: PathBuf,
    pub timeout_secs: u64,
    pub retries: u32,
    pub delay_ms: u64,
    pub max_pages: Option<usize>,
    pub max_bytes: Option<u64>,
    pub max_depth: Option<usize>,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub write_root_index: bool,
    pub follow_stylesheets: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            base_domain: None,
            root: PathBuf::from(DEFAULT_ROOT),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            delay_ms: 0,
            max_pages: None,
            max_bytes: None,
            max_depth: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            write_root_index: false,
            follow_stylesheets: false,
        }
    }
}

impl MirrorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_base_domain(mut self, domain: impl Into<String>) -> Self {
        self.base_domain = Some(domain.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_root_index(mut self, enabled: bool) -> Self {
        self.write_root_index = enabled;
        self
    }

    pub fn with_follow_stylesheets(mut self, enabled: bool) -> Self {
        self.follow_stylesheets = enabled;
        self
    }

    pub fn seed_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| MirrorError::UrlParse(format!("{}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MirrorError::UnsupportedScheme(self.base_url.clone()));
        }
        Ok(url)
    }

    /// The configured base domain, or the seed's host (with its port, when
    /// the seed names one explicitly).
    pub fn effective_base_domain(&self) -> Result<String> {
        if let Some(domain) = self.base_domain.as_deref().filter(|d| !d.is_empty()) {
            return Ok(domain.to_ascii_lowercase());
        }
        let seed = self.seed_url()?;
        let host = seed
            .host_str()
            .ok_or_else(|| MirrorError::UrlParse(format!("{}: no host", self.base_url)))?;
        Ok(match seed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::default();
        assert_eq!(config.root, PathBuf::from("downloads"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.retries, 2);
        assert_eq!(config.delay_ms, 0);
        assert!(config.max_pages.is_none());
        assert!(config.max_depth.is_none());
        assert!(!config.write_root_index);
        assert!(!config.follow_stylesheets);
    }

    #[test]
    fn test_base_domain_falls_back_to_seed_host() {
        let config = MirrorConfig::new("https://www.example.com/start");
        assert_eq!(config.effective_base_domain().unwrap(), "www.example.com");

        let config = MirrorConfig::new("http://127.0.0.1:8080/");
        assert_eq!(config.effective_base_domain().unwrap(), "127.0.0.1:8080");

        let config = MirrorConfig::new("https://example.com").with_base_domain("Example.COM");
        assert_eq!(config.effective_base_domain().unwrap(), "example.com");
    }

    #[test]
    fn test_seed_must_be_http() {
        assert!(matches!(
            MirrorConfig::new("ftp://example.com/").seed_url(),
            Err(MirrorError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            MirrorConfig::new("not a url").seed_url(),
            Err(MirrorError::UrlParse(_))
        ));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: MirrorConfig =
            serde_json::from_str(r#"{"base_url":"https://example.com","max_pages":5}"#).unwrap();
        assert_eq!(config.max_pages, Some(5));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.root, PathBuf::from("downloads"));
    }
}
