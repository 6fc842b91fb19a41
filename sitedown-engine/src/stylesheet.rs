// url(...) and @import references inside stylesheets

use crate::kind::{ResourceKind, classify_url};
use crate::path_map::{MirrorLayout, relative_link};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?P<q>["']?)(?P<val>[^"')]+?)["']?\s*\)"#)
        .expect("css url pattern is valid")
});

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?P<q>["'])(?P<val>[^"']+)["']"#).expect("css import pattern is valid")
});

/// References found in a stylesheet, in source order, `@import`s first.
pub fn extract_stylesheet_links(css: &str) -> Vec<String> {
    CSS_IMPORT
        .captures_iter(css)
        .chain(CSS_URL.captures_iter(css))
        .map(|caps| caps["val"].trim().to_string())
        .filter(|reference| is_fetchable(reference))
        .collect()
}

/// Rewrite stylesheet references relative to the stylesheet's own mirror file.
pub fn rewrite_stylesheet(layout: &MirrorLayout, css: &str, css_url: &Url) -> String {
    let own_path = layout.map_url(css_url, ResourceKind::Css);
    let Some(css_dir) = own_path.parent() else {
        return css.to_string();
    };

    let imports_done = CSS_IMPORT.replace_all(css, |caps: &Captures| {
        match local_reference(layout, &caps["val"], css_url, css_dir, Some(ResourceKind::Css)) {
            Some(local) => format!("@import {}{}{}", &caps["q"], local, &caps["q"]),
            None => caps[0].to_string(),
        }
    });

    CSS_URL
        .replace_all(&imports_done, |caps: &Captures| {
            match local_reference(layout, &caps["val"], css_url, css_dir, None) {
                Some(local) => format!("url({}{}{})", &caps["q"], local, &caps["q"]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn local_reference(
    layout: &MirrorLayout,
    raw: &str,
    css_url: &Url,
    css_dir: &Path,
    kind: Option<ResourceKind>,
) -> Option<String> {
    let raw = raw.trim();
    if !is_fetchable(raw) {
        return None;
    }
    let resolved = css_url.join(raw).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    let kind = kind.unwrap_or_else(|| classify_url(&resolved));
    relative_link(css_dir, &layout.map_url(&resolved, kind))
}

fn is_fetchable(reference: &str) -> bool {
    !reference.is_empty() && !reference.starts_with("data:") && !reference.starts_with('#')
}
