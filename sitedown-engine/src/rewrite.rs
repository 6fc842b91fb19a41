//! Textual rewrite pass that repoints `href`/`src` references at the mirror.
//!
//! Substitution works on the raw markup with a regex instead of
//! re-serialising the parsed tree, so whitespace, comments and attribute
//! formatting outside the touched values come out byte-for-byte identical.

use crate::kind::{ResourceKind, classify_url};
use crate::path_map::{CDN_FILES_PATH, CDN_IMAGE_PROXY, MirrorLayout, relative_link};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

static REFERENCE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<lead>\s)(?P<attr>(?i:href|src))(?P<eq>\s*=\s*)(?P<q>["'])(?P<val>[^"']*)["']"#)
        .expect("reference attribute pattern is valid")
});

#[derive(Debug, Clone)]
pub struct ContentRewriter {
    layout: MirrorLayout,
}

impl ContentRewriter {
    pub fn new(layout: MirrorLayout) -> Self {
        Self { layout }
    }

    /// Rewrite every `href=`/`src=` value in `html` to a path relative to the
    /// mirror location of `page_url`, then flatten residual CDN proxy paths.
    pub fn rewrite(&self, html: &str, page_url: &Url) -> String {
        let page_dir = self.layout.page_dir(page_url);

        let rewritten = REFERENCE_ATTR.replace_all(html, |caps: &Captures| {
            let is_href = caps["attr"].eq_ignore_ascii_case("href");
            match self.local_reference(&caps["val"], is_href, page_url, &page_dir) {
                Some(local) => format!(
                    "{}{}{}{}{}{}",
                    &caps["lead"], &caps["attr"], &caps["eq"], &caps["q"], local, &caps["q"]
                ),
                None => caps[0].to_string(),
            }
        });

        rewritten.replace(CDN_IMAGE_PROXY, CDN_FILES_PATH)
    }

    fn local_reference(
        &self,
        raw: &str,
        is_href: bool,
        page_url: &Url,
        page_dir: &Path,
    ) -> Option<String> {
        if raw.is_empty() || (is_href && raw.starts_with('#')) {
            return None;
        }

        let decoded = html_escape::decode_html_entities(raw);
        let resolved = page_url.join(decoded.trim()).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }

        // href targets are always mirrored as navigable pages here
        let kind = if is_href {
            ResourceKind::Html
        } else {
            classify_url(&resolved)
        };
        let local = self.layout.map_url(&resolved, kind);
        let mut relative = relative_link(page_dir, &local)?;

        if is_href && let Some(fragment) = resolved.fragment() {
            relative.push('#');
            relative.push_str(fragment);
        }
        Some(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> ContentRewriter {
        ContentRewriter::new(MirrorLayout::new("downloads"))
    }

    fn rewrite_on(page: &str, html: &str) -> String {
        rewriter().rewrite(html, &Url::parse(page).unwrap())
    }

    #[test]
    fn test_fragment_href_untouched() {
        let html = r##"<a href="#section">Jump</a>"##;
        assert_eq!(rewrite_on("https://example.com/", html), html);
    }

    #[test]
    fn test_empty_values_untouched() {
        let html = r#"<a href="">x</a><img src="">"#;
        assert_eq!(rewrite_on("https://example.com/", html), html);
    }

    #[test]
    fn test_root_page_href_is_sibling_file() {
        let html = r#"<a href="/about">About</a>"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<a href="about.html">About</a>"#
        );
    }

    #[test]
    fn test_root_page_without_trailing_slash() {
        let html = r#"<a href="/docs/">Docs</a>"#;
        assert_eq!(
            rewrite_on("https://example.com", html),
            r#"<a href="docs/index.html">Docs</a>"#
        );
    }

    #[test]
    fn test_nested_page_href_climbs_to_host_dir() {
        let html = r#"<a href="/about">About</a>"#;
        assert_eq!(
            rewrite_on("https://example.com/docs/guide", html),
            r#"<a href="../about.html">About</a>"#
        );
    }

    #[test]
    fn test_extensionless_page_links_to_sibling() {
        // /about is stored as about.html next to contact.html
        let html = r#"<a href="contact">Contact</a>"#;
        assert_eq!(
            rewrite_on("https://example.com/about", html),
            r#"<a href="contact.html">Contact</a>"#
        );
    }

    #[test]
    fn test_src_is_classified_and_sharded() {
        let html = r#"<img src="/img/logo.png"><script src="https://cdn.other.com/lib.js"></script>"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<img src="../images/example_com/img/logo.png"><script src="../js/cdn_other_com/lib.js"></script>"#
        );
    }

    #[test]
    fn test_stylesheet_href_is_treated_as_page() {
        let html = r#"<link rel="stylesheet" href="/site.css">"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<link rel="stylesheet" href="site.css">"#
        );
    }

    #[test]
    fn test_href_fragment_is_kept() {
        let html = r#"<a href="/about#team">Team</a>"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<a href="about.html#team">Team</a>"#
        );
    }

    #[test]
    fn test_quote_style_and_spacing_preserved() {
        let html = "<a  class=x   href = 'page.html'  >p</a>\n<!-- keep -->\n";
        assert_eq!(
            rewrite_on("https://example.com/", html),
            "<a  class=x   href = 'page.html'  >p</a>\n<!-- keep -->\n"
        );
        let html = "<img\n   SRC='/a.gif'>";
        assert_eq!(
            rewrite_on("https://example.com/", html),
            "<img\n   SRC='../images/example_com/a.gif'>"
        );
    }

    #[test]
    fn test_non_http_references_untouched() {
        let html = r#"<a href="mailto:me@example.com">m</a><a href="javascript:void(0)">j</a><img src="data:image/png;base64,AAAA">"#;
        assert_eq!(rewrite_on("https://example.com/", html), html);
    }

    #[test]
    fn test_data_attributes_are_not_rewritten() {
        let html = r#"<img data-src="/lazy.png" src="/now.png">"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<img data-src="/lazy.png" src="../images/example_com/now.png">"#
        );
    }

    #[test]
    fn test_entities_decoded_before_resolving() {
        let html = r#"<a href="/a&amp;b">x</a>"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<a href="a&b.html">x</a>"#
        );
    }

    #[test]
    fn test_cdn_proxy_src_and_residual_cleanup() {
        let html = r#"<img src="/cdn-cgi/image/w=200/photo.jpg"><div style="background:url(/cdn-cgi/image/w=9/bg.png)"></div>"#;
        assert_eq!(
            rewrite_on("https://example.com/", html),
            r#"<img src="../images/example_com/files/photo.jpg"><div style="background:url(/files/w=9/bg.png)"></div>"#
        );
    }

    #[test]
    fn test_srcset_left_alone() {
        let html = r#"<img srcset="/a.jpg 1x, /b.jpg 2x">"#;
        assert_eq!(rewrite_on("https://example.com/", html), html);
    }
}
