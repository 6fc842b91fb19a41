// Tests for mirror orchestration

use sitedown_core::mirror::{MirrorOptions, execute_mirror, extract_url_path};
use sitedown_engine::path_map::host_dir;
use sitedown_engine::{MirrorConfig, MirrorResult, Outcome};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
}

#[test]
fn test_extract_url_path_empty_path() {
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(extract_url_path("http://example.com/docs/v1/intro.html"), "/docs/v1/intro.html");
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/page?key=value#top"), "/page");
}

#[test]
fn test_extract_url_path_with_port() {
    assert_eq!(extract_url_path("http://localhost:3000/img/logo.png"), "/img/logo.png");
}

#[test]
fn test_extract_url_path_with_trailing_slash() {
    assert_eq!(extract_url_path("http://example.com/blog/"), "/blog/");
}

#[test]
fn test_extract_url_path_mailto() {
    assert_eq!(extract_url_path("mailto:someone@example.com"), "someone@example.com");
}

#[test]
fn test_extract_url_path_invalid_url() {
    let url = "not a valid url";
    assert_eq!(extract_url_path(url), url);
}

// ============================================================================
// Orchestration Tests
// ============================================================================

async fn site(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(body.as_bytes().to_vec()),
        )
        .mount(&server)
        .await;
    server
}

fn template() -> MirrorConfig {
    MirrorConfig::default()
        .with_root("ignored-by-options")
        .with_retries(0)
        .with_timeout(5)
}

fn options(seeds: Vec<String>, root: &Path) -> MirrorOptions {
    MirrorOptions {
        seeds,
        root: root.to_path_buf(),
        config: template(),
        show_progress: false,
    }
}

fn seed_page(root: &Path, server: &MockServer) -> std::path::PathBuf {
    let url = Url::parse(&server.uri()).unwrap();
    root.join(host_dir(&url)).join("index.html")
}

#[tokio::test]
async fn test_execute_mirror_mirrors_every_seed() {
    let first = site("<p>first</p>").await;
    let second = site("<p>second</p>").await;
    let dir = TempDir::new().unwrap();

    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let progress = Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    let results = execute_mirror(
        options(vec![first.uri(), second.uri()], dir.path()),
        Some(progress),
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.outcome == Outcome::Saved));
    assert_eq!(
        std::fs::read_to_string(seed_page(dir.path(), &first)).unwrap(),
        "<p>first</p>"
    );
    assert_eq!(
        std::fs::read_to_string(seed_page(dir.path(), &second)).unwrap(),
        "<p>second</p>"
    );

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.starts_with("Mirroring site 1/2")));
    assert!(messages.iter().any(|m| m.starts_with("Mirroring site 2/2")));
}

#[tokio::test]
async fn test_execute_mirror_failed_seed_does_not_stop_others() {
    let server = site("<p>ok</p>").await;
    let dir = TempDir::new().unwrap();

    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let progress = Arc::new(move |msg: String| sink.lock().unwrap().push(msg));

    let results = execute_mirror(
        options(vec!["ftp://files.example.com/".to_string(), server.uri()], dir.path()),
        Some(progress),
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Saved);
    assert!(seed_page(dir.path(), &server).is_file());

    let messages = messages.lock().unwrap();
    assert!(
        messages
            .iter()
            .any(|m| m.starts_with("[!]  Failed to mirror ftp://files.example.com/"))
    );
}

#[tokio::test]
async fn test_execute_mirror_streams_results() {
    let server = site(r#"<a href="/missing">gone</a>"#).await;
    let dir = TempDir::new().unwrap();

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let on_result = Arc::new(move |result: &MirrorResult| {
        sink.lock().unwrap().push(result.url.clone());
    });

    let results = execute_mirror(options(vec![server.uri()], dir.path()), None, Some(on_result))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), results.len());
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.outcome == Outcome::Failed));
}

#[tokio::test]
async fn test_execute_mirror_uses_options_root() {
    let server = site("<p>root</p>").await;
    let dir = TempDir::new().unwrap();

    execute_mirror(options(vec![server.uri()], dir.path()), None, None)
        .await
        .unwrap();

    assert!(seed_page(dir.path(), &server).is_file());
    assert!(!Path::new("ignored-by-options").exists());
}
