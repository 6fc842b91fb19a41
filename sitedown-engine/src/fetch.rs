use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
const MAX_REDIRECTS: usize = 10;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// A successfully fetched resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Transport used by the crawl driver. Any non-2xx final status is an error.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Fetched>;
}

pub struct HttpFetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(proxy) = config.proxy.as_deref() {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            retries: config.retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, url: &Url) -> std::result::Result<Fetched, Attempt> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Attempt::Transient(e.into())
                } else {
                    Attempt::Permanent(e.into())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error = MirrorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
            return Err(if is_transient_status(status) {
                Attempt::Transient(error)
            } else {
                Attempt::Permanent(error)
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Attempt::Transient(e.into()))?;

        Ok(Fetched {
            url: final_url,
            status: status.as_u16(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Fetched> {
        let mut attempt = 0;
        loop {
            debug!(%url, attempt, "GET");
            match self.attempt(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(Attempt::Transient(e)) if attempt < self.retries => {
                    attempt += 1;
                    let delay = self.backoff * attempt;
                    warn!(%url, attempt, error = %e, "transient failure, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(Attempt::Transient(e) | Attempt::Permanent(e)) => return Err(e),
            }
        }
    }
}

enum Attempt {
    Transient(MirrorError),
    Permanent(MirrorError),
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header_exists, method, path},
    };

    fn fetcher(retries: u32) -> HttpFetcher {
        let config = MirrorConfig::default().with_retries(retries).with_timeout(5);
        HttpFetcher::new(&config)
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_fetch_returns_bytes_and_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site.css"))
            .and(header_exists("user-agent"))
            .and(header_exists("accept-language"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/css; charset=utf-8")
                    .set_body_bytes(b"body{}"),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/site.css", mock_server.uri())).unwrap();
        let fetched = fetcher(0).fetch(&url).await.unwrap();

        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.content_type.as_deref(), Some("text/css; charset=utf-8"));
        assert_eq!(fetched.bytes, b"body{}");
    }

    #[tokio::test]
    async fn test_not_found_is_status_error_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let result = fetcher(3).fetch(&url).await;

        assert!(matches!(
            result,
            Err(MirrorError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<p>ok</p>"),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/flaky", mock_server.uri())).unwrap();
        let fetched = fetcher(2).fetch(&url).await.unwrap();

        assert_eq!(fetched.bytes, b"<p>ok</p>");
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/down", mock_server.uri())).unwrap();
        let result = fetcher(2).fetch(&url).await;

        assert!(matches!(
            result,
            Err(MirrorError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
    }
}
