//! Deterministic URL → local mirror path mapping.
//!
//! Layout produced under the mirror root:
//!
//! * HTML pages: `{root}/{host_dir}/{cleaned path}`
//! * everything else: `{root}/{kind}/{host_dir}/{cleaned path}`
//!
//! where `host_dir` is the host with `.` replaced by `_` (and `_port` appended
//! when the URL carries an explicit port). Mapping is pure: no filesystem or
//! network access happens here.

use crate::error::{MirrorError, Result};
use crate::kind::{ResourceKind, path_extension};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Path marker of the CDN image-transformation proxy.
pub const CDN_IMAGE_PROXY: &str = "/cdn-cgi/image/";

/// Flat path that CDN proxy URLs are rewritten onto.
pub const CDN_FILES_PATH: &str = "/files/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a raw URL string. Malformed URLs are reported, never panicked on.
    pub fn map_path(&self, url: &str, kind: ResourceKind) -> Result<PathBuf> {
        let parsed = Url::parse(url).map_err(|e| MirrorError::UrlParse(format!("{url}: {e}")))?;
        Ok(self.map_url(&parsed, kind))
    }

    pub fn map_url(&self, url: &Url, kind: ResourceKind) -> PathBuf {
        let path = with_default_extension(strip_cdn_proxy(url.path()), kind);

        let mut local = self.root.clone();
        if let Some(subdir) = kind.subdir() {
            local.push(subdir);
        }
        let host = host_dir(url);
        if !host.is_empty() {
            local.push(host);
        }
        local.push(clean_path(&path));
        local
    }

    /// Directory holding the page's own mirror file. Relative links written
    /// into a page are computed from here.
    pub fn page_dir(&self, page: &Url) -> PathBuf {
        let page_path = self.map_url(page, ResourceKind::Html);
        page_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }

    /// Directory holding every HTML page mirrored from the URL's host.
    pub fn host_root(&self, url: &Url) -> PathBuf {
        self.root.join(host_dir(url))
    }

    /// Whether a local path sits inside one of the non-HTML kind subtrees.
    pub fn is_resource_path(&self, local: &Path) -> bool {
        let Ok(rest) = local.strip_prefix(&self.root) else {
            return false;
        };
        match rest.components().next() {
            Some(Component::Normal(first)) => ResourceKind::ALL
                .iter()
                .filter_map(|kind| kind.subdir())
                .any(|subdir| first == subdir),
            _ => false,
        }
    }

    /// Inverse of `map_url` for a resource of the page's own host: the URL a
    /// local path under `{root}/{kind}/{host_dir}/` was stored from. Queries
    /// and inferred extensions cannot be recovered.
    pub fn recover_url(&self, page: &Url, local: &Path) -> Option<Url> {
        let host = host_dir(page);
        let rest = ResourceKind::ALL
            .iter()
            .filter_map(|kind| kind.subdir())
            .find_map(|subdir| local.strip_prefix(self.root.join(subdir).join(&host)).ok())?;

        let segments: Vec<String> = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            return None;
        }

        let mut url = page.clone();
        url.set_path(&format!("/{}", segments.join("/")));
        url.set_query(None);
        url.set_fragment(None);
        Some(url)
    }

    /// Resolve a relative reference found in a mirrored page against that
    /// page's directory, without leaving the realm of plain path arithmetic.
    pub fn resolve_local(&self, page_dir: &Path, reference: &str) -> PathBuf {
        let reference = reference
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        normalize_lexically(&page_dir.join(reference))
    }
}

/// Filesystem-safe directory name for the URL's host.
pub fn host_dir(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let mut dir = host.replace(['.', ':'], "_");
    if let Some(port) = url.port() {
        dir.push('_');
        dir.push_str(&port.to_string());
    }
    dir
}

/// Rewrite `/…/cdn-cgi/image/<params>/<rest>` to `/files/<rest>`, dropping
/// the proxy's transform parameters.
pub fn strip_cdn_proxy(path: &str) -> Cow<'_, str> {
    if !path.contains(CDN_IMAGE_PROXY) {
        return Cow::Borrowed(path);
    }

    let parts: Vec<&str> = path.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cdn-cgi" && i + 2 < parts.len() && parts[i + 1] == "image" {
            let rest = parts.get(i + 3..).map(|r| r.join("/")).unwrap_or_default();
            return Cow::Owned(format!("{CDN_FILES_PATH}{rest}"));
        }
    }
    Cow::Borrowed(path)
}

fn with_default_extension(path: Cow<'_, str>, kind: ResourceKind) -> String {
    let mut path = path.into_owned();
    if path.is_empty() || path.ends_with('/') {
        path.push_str("index");
        if let Some(ext) = kind.default_extension() {
            path.push('.');
            path.push_str(ext);
        }
    } else if path_extension(&path).is_none()
        && let Some(ext) = kind.default_extension()
    {
        path.push('.');
        path.push_str(ext);
    }
    path
}

/// Turn a URL path into a relative filesystem path: percent-decoded,
/// `.`/`..` resolved, no leading slash, never escaping its parent.
pub fn clean_path(path: &str) -> PathBuf {
    let mut segments: Vec<String> = Vec::new();
    for raw in path.split('/') {
        let segment = urlencoding::decode(raw)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw.to_string());
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment.replace(['/', '\\', '\0'], "_")),
        }
    }
    segments.iter().collect()
}

/// Relative reference from a directory to a file, always with `/` separators.
pub fn relative_link(from_dir: &Path, target: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(target, from_dir)?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
