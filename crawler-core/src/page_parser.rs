//! The Page Parser (spec.md §4.5).
//!
//! Like the Canonicalizer, title extraction is regex-based rather than a
//! full HTML parse — the same "keep that choice" design note applies (see
//! `canonical.rs`). Grounded in `original_source/src/crawler_core.py`'s title
//! handling: first `<title>` occurrence, whitespace-collapsed, truncated,
//! falling back to a literal placeholder, with parse failures swallowed
//! rather than escalated.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::canonical::extract_links;

const NO_TITLE: &str = "No Title Found";
const TITLE_MAX_LEN: usize = 200;

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
}

pub struct ParsedPage {
    pub title: String,
    pub links: std::collections::HashSet<Url>,
}

/// Parses a fetched body given its (possibly absent) `Content-Type`. Never
/// fails: a body that doesn't look like anything recognizable becomes a
/// `ParsedPage` with an empty link set, never a `parse_error`.
pub fn parse(body: &[u8], content_type: Option<&str>, base_url: &Url) -> ParsedPage {
    let is_html = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false);

    if !is_html {
        let label = content_type.unwrap_or("unknown");
        return ParsedPage {
            title: format!("Non-HTML content ({label})"),
            links: std::collections::HashSet::new(),
        };
    }

    let html = String::from_utf8_lossy(body);
    let title = extract_title(&html);
    let links = extract_links(body, base_url);

    ParsedPage { title, links }
}

fn extract_title(html: &str) -> String {
    let raw_title = match TITLE.captures(html) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or(""),
        None => return NO_TITLE.to_owned(),
    };

    let collapsed = WHITESPACE.replace_all(raw_title.trim(), " ").into_owned();
    if collapsed.is_empty() {
        return NO_TITLE.to_owned();
    }

    collapsed.chars().take(TITLE_MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn extracts_and_collapses_title() {
        let html = "<html><head><title>  Hello\n  World  </title></head></html>";
        let parsed = parse(html.as_bytes(), Some("text/html; charset=utf-8"), &base());
        assert_eq!(parsed.title, "Hello World");
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let html = "<html><body>no title here</body></html>";
        let parsed = parse(html.as_bytes(), Some("text/html"), &base());
        assert_eq!(parsed.title, NO_TITLE);
    }

    #[test]
    fn truncates_long_titles_to_200_chars() {
        let long_title = "x".repeat(400);
        let html = format!("<title>{long_title}</title>");
        let parsed = parse(html.as_bytes(), Some("text/html"), &base());
        assert_eq!(parsed.title.chars().count(), TITLE_MAX_LEN);
    }

    #[test]
    fn non_html_content_skips_link_extraction() {
        let body = br#"{"href": "https://example.com/should-not-be-seen"}"#;
        let parsed = parse(body, Some("application/json"), &base());
        assert_eq!(parsed.title, "Non-HTML content (application/json)");
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn missing_content_type_is_treated_as_non_html() {
        let parsed = parse(b"whatever", None, &base());
        assert_eq!(parsed.title, "Non-HTML content (unknown)");
    }

    #[test]
    fn extracts_links_for_html_content() {
        let html = r#"<a href="/a">a</a><title>T</title>"#;
        let parsed = parse(html.as_bytes(), Some("text/html"), &base());
        assert_eq!(parsed.title, "T");
        assert!(parsed.links.contains(&Url::parse("https://example.com/a").unwrap()));
    }
}
