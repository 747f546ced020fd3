//! crates/notebook_core/src/sanitize.rs
//!
//! Allow-list HTML cleaning for page content, and the word count derived from it.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "b", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li",
    "a", "img", "blockquote", "code", "pre", "table", "thead", "tbody", "tr", "td", "th",
];

const ALLOWED_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title", "class"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "data"];

/// Cleans untrusted HTML down to the tags and attributes page content may use.
///
/// Script and style elements are removed with their content, event-handler
/// attributes and comments are dropped, and URLs outside the allowed schemes
/// are stripped. `data:` URLs survive only as inline images.
pub struct HtmlSanitizer {
    cleaner: ammonia::Builder<'static>,
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSanitizer {
    pub fn new() -> Self {
        let mut cleaner = ammonia::Builder::default();
        cleaner
            .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
            .generic_attributes(ALLOWED_ATTRIBUTES.iter().copied().collect::<HashSet<_>>())
            .tag_attributes(HashMap::new())
            .url_schemes(URL_SCHEMES.iter().copied().collect::<HashSet<_>>())
            .link_rel(None)
            .attribute_filter(|element, attribute, value| {
                let is_data_url = matches!(attribute, "href" | "src")
                    && value.trim_start().to_ascii_lowercase().starts_with("data:");
                if !is_data_url {
                    return Some(Cow::Borrowed(value));
                }
                let inline_image = element == "img"
                    && attribute == "src"
                    && value
                        .trim_start()
                        .to_ascii_lowercase()
                        .starts_with("data:image/");
                if inline_image {
                    Some(Cow::Borrowed(value))
                } else {
                    None
                }
            });
        Self { cleaner }
    }

    /// Returns the cleaned markup. Cleaning already-clean output is a no-op.
    pub fn sanitize(&self, raw_html: &str) -> String {
        self.cleaner.clean(raw_html).to_string()
    }
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// Counts whitespace-separated words in the text of `safe_html`.
///
/// Tags are replaced by spaces, so adjacent block elements never glue words
/// together. Callers pass sanitized markup, never raw input.
pub fn word_count(safe_html: &str) -> usize {
    tag_pattern()
        .replace_all(safe_html, " ")
        .split_whitespace()
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> String {
        HtmlSanitizer::new().sanitize(raw)
    }

    #[test]
    fn script_tags_are_removed_with_their_content() {
        assert_eq!(sanitize("<p>Hi</p><script>alert(1)</script>"), "<p>Hi</p>");
    }

    #[test]
    fn event_handlers_are_dropped() {
        let cleaned = sanitize(r#"<img src="cat.png" alt="cat" onerror="alert(1)">"#);
        assert!(!cleaned.contains("onerror"));
        assert!(cleaned.contains(r#"src="cat.png""#));
        assert!(cleaned.contains(r#"alt="cat""#));
    }

    #[test]
    fn javascript_urls_are_dropped() {
        let cleaned = sanitize(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!cleaned.contains("javascript"));
        assert!(cleaned.contains("click"));
    }

    #[test]
    fn allowed_markup_is_preserved() {
        let html = r#"<p><strong>bold</strong> <em>it</em> <u>under</u></p><h2 class="x">Title</h2><ul><li>one</li></ul><blockquote>q</blockquote><pre><code>let x = 1;</code></pre>"#;
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn links_keep_href_without_rel() {
        let html = r#"<a href="https://example.com" title="ex">ex</a>"#;
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn unknown_tags_are_unwrapped() {
        assert_eq!(
            sanitize("<div><span>text</span></div><iframe src=\"https://x\"></iframe>"),
            "text"
        );
    }

    #[test]
    fn data_urls_only_survive_on_images() {
        let image = sanitize(r#"<img src="data:image/png;base64,AAAA">"#);
        assert!(image.contains("data:image/png;base64,AAAA"));

        let link = sanitize(r#"<a href="data:text/html;base64,PHNjcmlwdD4=">x</a>"#);
        assert!(!link.contains("data:"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "<p>Hi</p><script>alert(1)</script>",
            r#"<p onclick="x()">a &amp; b <a href="/rel">rel</a></p><img src=x onerror=y>"#,
            "<table><tr><td>1</td></tr></table>",
            "plain text with <unclosed",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn word_count_ignores_markup() {
        assert_eq!(word_count("<p>Hello <b>world</b></p>"), 2);
        assert_eq!(word_count("<p>one</p><p>two</p>"), 2);
        assert_eq!(word_count("  spaced \n\t out  "), 2);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("<p></p><br>"), 0);
    }
}
