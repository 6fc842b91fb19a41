use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::extract::{extract_links, parse_html};
use crate::fetch::{Fetch, Fetched, HttpFetcher};
use crate::kind::{ResourceKind, resolve_kind};
use crate::path_map::{MirrorLayout, relative_link};
use crate::result::{MirrorResult, Outcome};
use crate::rewrite::ContentRewriter;
use crate::store::{ResourceStore, SaveOutcome};
use crate::stylesheet::{extract_stylesheet_links, rewrite_stylesheet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(&MirrorResult) + Send + Sync>;

/// State owned by a single mirroring run.
///
/// The visited set only ever grows, and a URL is claimed with one atomic
/// check-and-insert before any network or filesystem work is done for it.
pub struct CrawlSession {
    base_domain: String,
    visited: Arc<Mutex<HashSet<String>>>,
    pages: AtomicUsize,
    fetches: AtomicUsize,
    bytes: AtomicU64,
}

impl CrawlSession {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into().to_ascii_lowercase(),
            visited: Arc::new(Mutex::new(HashSet::new())),
            pages: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Claim `url` for this run. Returns false if it was already claimed.
    pub async fn mark_dispatched(&self, url: &str) -> bool {
        self.visited.lock().await.insert(url.to_string())
    }

    pub async fn visited_count(&self) -> usize {
        self.visited.lock().await.len()
    }

    pub fn is_in_domain(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if host.eq_ignore_ascii_case(&self.base_domain) {
            return true;
        }
        url.port()
            .is_some_and(|port| format!("{host}:{port}") == self.base_domain)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn bytes_fetched(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    fn record_fetch(&self, bytes: u64) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Count a traversed page, returning the new total.
    fn record_page(&self) -> usize {
        self.pages.fetch_add(1, Ordering::SeqCst) + 1
    }
}

struct WorkItem {
    url: String,
    /// Tried instead when `url` answers 404.
    fallback: Option<String>,
    depth: usize,
}

struct Child {
    url: String,
    fallback: Option<String>,
}

impl Child {
    fn new(url: String) -> Self {
        Self {
            url,
            fallback: None,
        }
    }
}

/// Outcome of one dispatched URL plus the references to dispatch after it.
struct Step {
    result: MirrorResult,
    children: Vec<Child>,
}

impl Step {
    fn leaf(result: MirrorResult) -> Self {
        Self {
            result,
            children: Vec::new(),
        }
    }
}

pub struct Mirror {
    config: MirrorConfig,
    layout: MirrorLayout,
    rewriter: ContentRewriter,
    store: ResourceStore,
    fetcher: Arc<dyn Fetch>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Mirror {
    pub fn new(config: MirrorConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: MirrorConfig, fetcher: Arc<dyn Fetch>) -> Self {
        let layout = MirrorLayout::new(config.root.clone());
        Self {
            rewriter: ContentRewriter::new(layout.clone()),
            layout,
            config,
            store: ResourceStore::new(),
            fetcher,
            progress_callback: None,
            result_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Mirror the configured site depth-first from its seed.
    ///
    /// Only an invalid seed or base domain is an error; every other failure
    /// is confined to the URL it happened on and shows up in its result.
    pub async fn run(&self) -> Result<Vec<MirrorResult>> {
        let mut seed = self.config.seed_url()?;
        seed.set_fragment(None);
        let session = CrawlSession::new(self.config.effective_base_domain()?);

        info!(
            seed = %seed,
            base_domain = session.base_domain(),
            root = %self.layout.root().display(),
            "Starting mirror"
        );

        let mut results = Vec::new();
        let mut stack = vec![WorkItem {
            url: seed.to_string(),
            fallback: None,
            depth: 0,
        }];

        while let Some(item) = stack.pop() {
            if !session.mark_dispatched(&item.url).await {
                debug!(url = %item.url, "already dispatched");
                continue;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(session.visited_count().await, item.url.clone());
            }

            let mut step = self.dispatch(&session, &item).await;

            let retry = match item.fallback {
                Some(fallback) if step.result.status == Some(404) => {
                    debug!(url = %item.url, %fallback, "not found, trying original form");
                    step.result.outcome = Outcome::Skipped;
                    Some(fallback)
                }
                _ => None,
            };

            if let Some(ref callback) = self.result_callback {
                callback(&step.result);
            }

            if let Some(fallback) = retry {
                stack.push(WorkItem {
                    url: fallback,
                    fallback: None,
                    depth: item.depth,
                });
                results.push(step.result);
                continue;
            }

            let follow = self.config.max_depth.is_none_or(|max| item.depth < max);
            if follow && !step.children.is_empty() {
                // Reverse so the first link in the document is popped first.
                let visited = session.visited.lock().await;
                for child in step.children.into_iter().rev() {
                    if !visited.contains(&child.url) {
                        stack.push(WorkItem {
                            url: child.url,
                            fallback: child.fallback,
                            depth: item.depth + 1,
                        });
                    }
                }
            } else if !step.children.is_empty() {
                debug!(url = %item.url, depth = item.depth, "depth limit reached, links not followed");
            }

            results.push(step.result);
        }

        info!(
            "Mirror complete. Dispatched {} URLs, {} network fetches, {} bytes",
            results.len(),
            session.fetch_count(),
            session.bytes_fetched()
        );
        Ok(results)
    }

    async fn dispatch(&self, session: &CrawlSession, item: &WorkItem) -> Step {
        let url = match Url::parse(&item.url) {
            Ok(url) => url,
            Err(e) => {
                let error = MirrorError::UrlParse(format!("{}: {e}", item.url));
                debug!(url = %item.url, "{}", error);
                return Step::leaf(MirrorResult::skipped(item.url.clone(), error.to_string()));
            }
        };
        if !matches!(url.scheme(), "http" | "https") {
            let error = MirrorError::UnsupportedScheme(item.url.clone());
            debug!(url = %item.url, "{}", error);
            return Step::leaf(MirrorResult::skipped(item.url.clone(), error.to_string()));
        }

        let in_domain = session.is_in_domain(&url);
        if !in_domain {
            let signal = MirrorError::OutOfDomain {
                url: url.to_string(),
                base_domain: session.base_domain().to_string(),
            };
            debug!("{}; storing without traversal", signal);
        }

        let mut step = match self.mirror_url(session, &url, in_domain, item.depth == 0).await {
            Ok(step) => step,
            Err(e) if e.is_failure() => {
                warn!(%url, error = %e, "failed to mirror");
                let mut result = MirrorResult::with_error(item.url.clone(), e.to_string());
                if let MirrorError::HttpStatus { status, .. } = e {
                    result.status = Some(status);
                }
                Step::leaf(result)
            }
            Err(e) => {
                info!(%url, "{}", e);
                Step::leaf(MirrorResult::skipped(item.url.clone(), e.to_string()))
            }
        };
        step.result.depth = item.depth;
        step.result.in_domain = in_domain;
        step
    }

    async fn mirror_url(
        &self,
        session: &CrawlSession,
        url: &Url,
        in_domain: bool,
        is_seed: bool,
    ) -> Result<Step> {
        if in_domain {
            let page_path = self.layout.map_url(url, ResourceKind::Html);
            if self.store.exists(&page_path).await {
                debug!(%url, path = %page_path.display(), "reloading page from disk");
                let bytes = self.store.load(&page_path).await?;
                return self.process_page(session, url, bytes, None, is_seed, true).await;
            }
        }

        if let Some((kind, path)) = self.find_existing(url, in_domain).await {
            debug!(%url, %kind, path = %path.display(), "already mirrored");
            let mut result = MirrorResult::new(url.to_string(), Outcome::SkippedExisting);
            result.kind = Some(kind);
            result.local_path = Some(path);
            return Ok(Step::leaf(result));
        }

        if let Some(max) = self.config.max_bytes
            && session.bytes_fetched() >= max
        {
            return Err(MirrorError::Budget(format!(
                "{} of {max} bytes fetched, not fetching {url}",
                session.bytes_fetched()
            )));
        }

        if self.config.delay_ms > 0 && session.fetch_count() > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }

        let fetched = self.fetcher.fetch(url).await?;
        session.record_fetch(fetched.bytes.len() as u64);

        let kind = resolve_kind(fetched.content_type.as_deref(), url, is_seed);
        debug!(%url, %kind, status = fetched.status, bytes = fetched.bytes.len(), "fetched");

        match kind {
            ResourceKind::Html if in_domain => {
                let status = fetched.status;
                let Fetched {
                    bytes,
                    content_type,
                    ..
                } = fetched;
                let mut step = self
                    .process_page(session, url, bytes, content_type, is_seed, false)
                    .await?;
                step.result.status = Some(status);
                Ok(step)
            }
            ResourceKind::Css if in_domain && self.config.follow_stylesheets => {
                self.process_stylesheet(url, fetched).await
            }
            _ => self.save_resource(url, kind, fetched).await,
        }
    }

    /// First kind whose mirror path already holds this URL. In-domain HTML is
    /// handled separately because it is traversed again on resume.
    async fn find_existing(&self, url: &Url, in_domain: bool) -> Option<(ResourceKind, PathBuf)> {
        for kind in ResourceKind::ALL {
            if in_domain && kind == ResourceKind::Html {
                continue;
            }
            let path = self.layout.map_url(url, kind);
            if self.store.exists(&path).await {
                return Some((kind, path));
            }
        }
        None
    }

    /// Decode, extract, rewrite and store an in-domain page, returning its
    /// links. Pages reloaded from disk are not written again.
    async fn process_page(
        &self,
        session: &CrawlSession,
        url: &Url,
        bytes: Vec<u8>,
        content_type: Option<String>,
        is_seed: bool,
        from_disk: bool,
    ) -> Result<Step> {
        let text = String::from_utf8(bytes).map_err(|_| MirrorError::Decode {
            url: url.to_string(),
        })?;
        let links = {
            let document = parse_html(&text);
            extract_links(&document)
        };

        let path = self.layout.map_url(url, ResourceKind::Html);
        let mut result = MirrorResult::new(url.to_string(), Outcome::SkippedExisting);
        result.kind = Some(ResourceKind::Html);
        result.content_type = content_type;
        result.links_found = links.len();
        result.from_disk = from_disk;

        if !from_disk {
            let rewritten = self.rewriter.rewrite(&text, url);
            if let SaveOutcome::Written(written) =
                self.store.save(&path, rewritten.as_bytes()).await?
            {
                info!(%url, path = %path.display(), bytes = written, links = links.len(), "saved page");
                result.outcome = Outcome::Saved;
                result.bytes = written;
            }
        }

        if is_seed && self.config.write_root_index {
            self.write_root_index(&path).await;
        }
        result.local_path = Some(path);

        let traversed = session.record_page();
        let children = match self.config.max_pages {
            Some(max) if traversed > max => {
                info!(%url, max_pages = max, "page budget reached, links not followed");
                Vec::new()
            }
            _ => self.page_children(url, &links, from_disk).await,
        };

        Ok(Step { result, children })
    }

    /// Absolute, fragment-free dispatch targets for a page's references.
    ///
    /// References in a page reloaded from disk were rewritten on the earlier
    /// run. Those pointing at files already on disk in a resource subtree, or
    /// at another host's pages, are not dispatched again; missing resources
    /// of the page's own host are recovered from their path. Pages that never
    /// reached the disk get their extensionless form as fallback.
    async fn page_children(&self, page_url: &Url, links: &[String], from_disk: bool) -> Vec<Child> {
        let page_dir = self.layout.page_dir(page_url);
        let host_root = self.layout.host_root(page_url);
        let mut children = Vec::with_capacity(links.len());

        for raw in links {
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }

            if from_disk && is_mirror_relative(raw) {
                let local = self.layout.resolve_local(&page_dir, raw);
                if self.layout.is_resource_path(&local) {
                    if self.store.exists(&local).await {
                        debug!(reference = raw, "resource already mirrored");
                    } else if let Some(url) = self.layout.recover_url(page_url, &local) {
                        children.push(Child::new(url.to_string()));
                    } else {
                        debug!(reference = raw, "missing resource of another host, not recoverable");
                    }
                    continue;
                }
                if !local.starts_with(&host_root) {
                    debug!(reference = raw, "points into another host's mirror");
                    continue;
                }

                let url = resolve_reference(page_url, raw);
                let fallback = if self.store.exists(&local).await {
                    None
                } else {
                    extensionless_form(&url)
                };

                // Extensionless hrefs serving non-HTML were stored under their
                // own kind; the rewritten `.html` form never existed.
                if let Some(ref original) = fallback
                    && let Ok(original_url) = Url::parse(original)
                    && let Some((kind, path)) = self.find_existing(&original_url, true).await
                {
                    debug!(reference = raw, %kind, path = %path.display(), "already mirrored as non-HTML");
                    continue;
                }

                children.push(Child { url, fallback });
                continue;
            }

            children.push(Child::new(resolve_reference(page_url, raw)));
        }

        children
    }

    async fn process_stylesheet(&self, url: &Url, fetched: Fetched) -> Result<Step> {
        let Ok(css) = std::str::from_utf8(&fetched.bytes) else {
            return self.save_resource(url, ResourceKind::Css, fetched).await;
        };

        let references = extract_stylesheet_links(css);
        let rewritten = rewrite_stylesheet(&self.layout, css, url);
        let children = references
            .iter()
            .map(|reference| Child::new(resolve_reference(url, reference)))
            .collect();

        let mut step = self
            .save_bytes(url, ResourceKind::Css, fetched.content_type, rewritten.as_bytes())
            .await?;
        step.result.status = Some(fetched.status);
        step.result.links_found = references.len();
        step.children = children;
        Ok(step)
    }

    async fn save_resource(&self, url: &Url, kind: ResourceKind, fetched: Fetched) -> Result<Step> {
        let mut step = self
            .save_bytes(url, kind, fetched.content_type, &fetched.bytes)
            .await?;
        step.result.status = Some(fetched.status);
        Ok(step)
    }

    async fn save_bytes(
        &self,
        url: &Url,
        kind: ResourceKind,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<Step> {
        let path = self.layout.map_url(url, kind);
        let mut result = MirrorResult::new(url.to_string(), Outcome::SkippedExisting);

        if let SaveOutcome::Written(written) = self.store.save(&path, bytes).await? {
            info!(%url, %kind, path = %path.display(), bytes = written, "saved resource");
            result.outcome = Outcome::Saved;
            result.bytes = written;
        }

        result.kind = Some(kind);
        result.content_type = content_type;
        result.local_path = Some(path);
        Ok(Step::leaf(result))
    }

    /// Redirect page at the mirror root pointing at the seed's mirror file.
    async fn write_root_index(&self, seed_path: &Path) {
        let index = self.layout.root().join("index.html");
        let Some(target) = relative_link(self.layout.root(), seed_path) else {
            return;
        };

        let target = html_escape::encode_double_quoted_attribute(&target);
        let html = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
             <meta http-equiv=\"refresh\" content=\"0; url={target}\">\
             <title>Mirror</title></head>\n\
             <body><a href=\"{target}\">{target}</a></body></html>\n"
        );

        match self.store.save(&index, html.as_bytes()).await {
            Ok(SaveOutcome::Written(_)) => info!(path = %index.display(), "wrote root index"),
            Ok(SaveOutcome::AlreadyPresent) => debug!(path = %index.display(), "root index exists"),
            Err(e) => warn!(error = %e, "could not write root index"),
        }
    }
}

/// Whether a reference is a path relative to the current document, which is
/// the only shape the rewriter produces.
fn is_mirror_relative(reference: &str) -> bool {
    !reference.starts_with('/') && Url::parse(reference).is_err()
}

/// `/about.html` → `/about`, `/docs/index.html` → `/docs/`: the URL forms
/// that the page mapper would have stored under the same file.
fn extensionless_form(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let stripped = if let Some(dir) = path.strip_suffix("index.html") {
        dir.to_string()
    } else {
        path.strip_suffix(".html")
            .filter(|stem| !stem.ends_with('/'))?
            .to_string()
    };
    parsed.set_path(&stripped);
    Some(parsed.to_string())
}

/// Resolve against the page, dropping any fragment. Unresolvable references
/// are returned raw and rejected when dispatched.
fn resolve_reference(base: &Url, reference: &str) -> String {
    match base.join(reference) {
        Ok(mut resolved) => {
            resolved.set_fragment(None);
            resolved.to_string()
        }
        Err(_) => reference.to_string(),
    }
}
