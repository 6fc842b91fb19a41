use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Coarse content classification that drives the mirror's storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Html,
    Css,
    Js,
    Images,
    Fonts,
    Media,
    FetchXhr,
    Other,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Html,
        ResourceKind::Css,
        ResourceKind::Js,
        ResourceKind::Images,
        ResourceKind::Fonts,
        ResourceKind::Media,
        ResourceKind::FetchXhr,
        ResourceKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Html => "html",
            ResourceKind::Css => "css",
            ResourceKind::Js => "js",
            ResourceKind::Images => "images",
            ResourceKind::Fonts => "fonts",
            ResourceKind::Media => "media",
            ResourceKind::FetchXhr => "fetch_xhr",
            ResourceKind::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
    }

    /// Mirror subdirectory for this kind. HTML pages live directly under the
    /// host directory so the site's own structure stays navigable.
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Html => None,
            other => Some(other.as_str()),
        }
    }

    /// Extension appended to extension-less paths of this kind.
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Html => Some("html"),
            ResourceKind::Css => Some("css"),
            ResourceKind::Js => Some("js"),
            ResourceKind::FetchXhr => Some("json"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a URL purely from the extension of its last path segment.
///
/// Never touches the network: unknown or missing extensions are `Other`.
pub fn classify(url: &str) -> ResourceKind {
    match Url::parse(url) {
        Ok(parsed) => classify_url(&parsed),
        Err(_) => ResourceKind::Other,
    }
}

pub fn classify_url(url: &Url) -> ResourceKind {
    match path_extension(url.path()).as_deref() {
        Some("css") => ResourceKind::Css,
        Some("js") => ResourceKind::Js,
        Some("jpg" | "jpeg" | "png" | "gif" | "webp" | "svg") => ResourceKind::Images,
        Some("woff" | "woff2" | "ttf" | "eot") => ResourceKind::Fonts,
        Some("mp4" | "avi" | "mov" | "wmv") => ResourceKind::Media,
        Some("json") => ResourceKind::FetchXhr,
        Some("html") => ResourceKind::Html,
        _ => ResourceKind::Other,
    }
}

/// Classify a `Content-Type` header value. Parameters such as `charset`
/// are ignored; anything unrecognised is `Other`.
pub fn classify_content_type(mime: &str) -> ResourceKind {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.contains("text/html") {
        ResourceKind::Html
    } else if essence.contains("text/css") {
        ResourceKind::Css
    } else if essence.contains("javascript") {
        ResourceKind::Js
    } else if essence.starts_with("image/") {
        ResourceKind::Images
    } else if essence.starts_with("font/") || essence.starts_with("application/font") {
        ResourceKind::Fonts
    } else if essence.starts_with("audio/") || essence.starts_with("video/") {
        ResourceKind::Media
    } else if essence == "application/json" || essence == "text/json" {
        ResourceKind::FetchXhr
    } else {
        ResourceKind::Other
    }
}

/// Kind of a fetched resource: the content type when it is recognised,
/// else the URL extension, else `Html` for the seed and `Other` otherwise.
pub fn resolve_kind(content_type: Option<&str>, url: &Url, is_seed: bool) -> ResourceKind {
    let by_type = content_type
        .map(classify_content_type)
        .unwrap_or(ResourceKind::Other);
    if by_type != ResourceKind::Other {
        return by_type;
    }
    match classify_url(url) {
        ResourceKind::Other if is_seed => ResourceKind::Html,
        by_url => by_url,
    }
}

/// Lowercased extension of the last segment of a URL path, if any.
pub(crate) fn path_extension(path: &str) -> Option<String> {
    let last = path.rsplit('/').next().unwrap_or_default();
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("https://example.com/site.css"), ResourceKind::Css);
        assert_eq!(classify("https://example.com/app.js"), ResourceKind::Js);
        assert_eq!(classify("https://example.com/a/b.JPEG"), ResourceKind::Images);
        assert_eq!(classify("https://example.com/f.woff2"), ResourceKind::Fonts);
        assert_eq!(classify("https://example.com/clip.mov"), ResourceKind::Media);
        assert_eq!(classify("https://example.com/data.json"), ResourceKind::FetchXhr);
        assert_eq!(classify("https://example.com/page.html"), ResourceKind::Html);
    }

    #[test]
    fn test_classify_ignores_query() {
        assert_eq!(
            classify("https://example.com/site.css?v=3"),
            ResourceKind::Css
        );
    }

    #[test]
    fn test_classify_unknown_is_other() {
        assert_eq!(classify("https://example.com/about"), ResourceKind::Other);
        assert_eq!(classify("https://example.com/"), ResourceKind::Other);
        assert_eq!(classify("https://example.com/file.htm"), ResourceKind::Other);
        assert_eq!(classify("not a url"), ResourceKind::Other);
    }

    #[test]
    fn test_resolve_kind_prefers_content_type() {
        let url = Url::parse("https://example.com/logo.png").unwrap();
        assert_eq!(
            resolve_kind(Some("text/css"), &url, false),
            ResourceKind::Css
        );
        assert_eq!(
            resolve_kind(Some("application/octet-stream"), &url, false),
            ResourceKind::Images
        );
        assert_eq!(resolve_kind(None, &url, false), ResourceKind::Images);
    }

    #[test]
    fn test_resolve_kind_seed_defaults_to_html() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(resolve_kind(None, &url, true), ResourceKind::Html);
        assert_eq!(resolve_kind(None, &url, false), ResourceKind::Other);
    }

    #[test]
    fn test_classify_dot_in_directory_only() {
        assert_eq!(classify("https://example.com/v1.2/api"), ResourceKind::Other);
    }

    #[test]
    fn test_classify_content_type() {
        assert_eq!(
            classify_content_type("text/html; charset=utf-8"),
            ResourceKind::Html
        );
        assert_eq!(classify_content_type("text/css"), ResourceKind::Css);
        assert_eq!(
            classify_content_type("application/javascript"),
            ResourceKind::Js
        );
        assert_eq!(classify_content_type("text/javascript"), ResourceKind::Js);
        assert_eq!(classify_content_type("image/webp"), ResourceKind::Images);
        assert_eq!(classify_content_type("font/woff2"), ResourceKind::Fonts);
        assert_eq!(
            classify_content_type("application/font-woff"),
            ResourceKind::Fonts
        );
        assert_eq!(classify_content_type("video/mp4"), ResourceKind::Media);
        assert_eq!(classify_content_type("audio/mpeg"), ResourceKind::Media);
        assert_eq!(
            classify_content_type("application/json"),
            ResourceKind::FetchXhr
        );
        assert_eq!(classify_content_type("text/json"), ResourceKind::FetchXhr);
        assert_eq!(
            classify_content_type("application/octet-stream"),
            ResourceKind::Other
        );
        assert_eq!(classify_content_type(""), ResourceKind::Other);
    }

    #[test]
    fn test_kind_names_round_trip_through_from_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_str("bogus"), None);
    }

    #[test]
    fn test_only_html_has_no_subdir() {
        assert_eq!(ResourceKind::Html.subdir(), None);
        assert_eq!(ResourceKind::FetchXhr.subdir(), Some("fetch_xhr"));
    }
}
