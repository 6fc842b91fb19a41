use scraper::{Html, node::Element};

/// Parse markup into a document tree. html5ever recovers from any input, so
/// this never fails; byte decoding happens before this point.
pub fn parse_html(text: &str) -> Html {
    Html::parse_document(text)
}

/// Collect candidate references from every element in document order.
///
/// Duplicates are kept; deduplication belongs to the crawl session. For
/// `img`/`source` a non-empty `src` wins, otherwise the first `srcset`
/// candidate is taken (single-resolution fetch policy).
pub fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(element) = node.value().as_element() else {
            continue;
        };
        let Some(attr_name) = reference_attribute(element.name()) else {
            continue;
        };

        if let Some(value) = element.attr(attr_name).filter(|v| !v.is_empty()) {
            links.push(value.to_string());
        } else if has_srcset(element)
            && let Some(first) = element.attr("srcset").and_then(first_srcset_candidate)
        {
            links.push(first.to_string());
        }
    }

    links
}

fn reference_attribute(tag: &str) -> Option<&'static str> {
    match tag {
        "a" | "link" => Some("href"),
        "script" | "img" | "source" | "iframe" | "audio" | "video" | "track" => Some("src"),
        _ => None,
    }
}

fn has_srcset(element: &Element) -> bool {
    matches!(element.name(), "img" | "source")
}

/// First URL of a `srcset` list: `"a.jpg 1x, b.jpg 2x"` → `a.jpg`.
pub fn first_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()?
        .split_whitespace()
        .next()
        .filter(|candidate| !candidate.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(html: &str) -> Vec<String> {
        extract_links(&parse_html(html))
    }

    #[test]
    fn test_href_and_src_in_document_order() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/site.css">
            <script src="/app.js"></script>
        </head><body>
            <a href="/about">About</a>
            <img src="/logo.png">
            <iframe src="/embed"></iframe>
            <video src="/clip.mp4"><track src="/subs.vtt"></video>
            <audio src="/song.mp3"></audio>
        </body></html>"#;

        assert_eq!(
            links(html),
            vec![
                "/site.css",
                "/app.js",
                "/about",
                "/logo.png",
                "/embed",
                "/clip.mp4",
                "/subs.vtt",
                "/song.mp3"
            ]
        );
    }

    #[test]
    fn test_img_src_wins_over_srcset() {
        let html = r#"<img src="a.jpg" srcset="b.jpg 1x, c.jpg 2x">"#;
        assert_eq!(links(html), vec!["a.jpg"]);
    }

    #[test]
    fn test_srcset_attribute_order_does_not_matter() {
        let html = r#"<img srcset="b.jpg 1x, c.jpg 2x" src="a.jpg">"#;
        assert_eq!(links(html), vec!["a.jpg"]);
    }

    #[test]
    fn test_source_srcset_first_candidate_only() {
        let html = r#"<picture>
            <source srcset="/hero-small.webp 480w, /hero-large.webp 1080w">
            <img src="/hero.jpg">
        </picture>"#;
        assert_eq!(links(html), vec!["/hero-small.webp", "/hero.jpg"]);
    }

    #[test]
    fn test_empty_attributes_are_skipped() {
        let html = r#"<a href="">x</a><script src=""></script><img src="" srcset=""><a>y</a>"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let html = r#"<a href="/x">1</a><a href="/x">2</a>"#;
        assert_eq!(links(html), vec!["/x", "/x"]);
    }

    #[test]
    fn test_fragments_and_schemes_are_returned_raw() {
        let html = r##"<a href="#top">t</a><a href="mailto:a@b.c">m</a>"##;
        assert_eq!(links(html), vec!["#top", "mailto:a@b.c"]);
    }

    #[test]
    fn test_ignores_unrelated_elements() {
        let html = r#"<div src="/nope"></div><form action="/submit"></form><a name="x"></a>"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_first_srcset_candidate() {
        assert_eq!(first_srcset_candidate("a.jpg 1x, b.jpg 2x"), Some("a.jpg"));
        assert_eq!(first_srcset_candidate("  a.jpg"), Some("a.jpg"));
        assert_eq!(first_srcset_candidate(""), None);
        assert_eq!(first_srcset_candidate(" , b.jpg"), None);
    }
}
