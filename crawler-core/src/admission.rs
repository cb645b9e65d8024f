//! The Admission Filter (spec.md §4.2): pure predicates deciding whether a
//! discovered link is even worth handing to the Frontier.
//!
//! Grounded in the teacher's `crawler/boundaries.rs` `Boundaries` trait
//! (`is_allowed`/`is_frontier`), narrowed from a pluggable trait to a single
//! free function set since this spec has exactly one admission policy, not a
//! pluggable one per backend.

use crate::config::Configuration;
use url::Url;

/// True if `url` may be queued at all: scheme allow-list, URL length cap,
/// the explicit domain blocklist, and the extension gate (blocked-extension
/// suffix check, then "no extension, or an allowed one"). Depth and
/// per-domain quota are the Frontier's concern, not this filter's (spec.md
/// §4.2 scopes those out explicitly).
pub fn is_allowed(url: &Url, config: &Configuration) -> bool {
    if !config.allowed_schemes.contains(url.scheme()) {
        return false;
    }

    if url.as_str().len() > config.max_url_length {
        return false;
    }

    let domain = url.host_str().unwrap_or_default();
    if config
        .blocked_domains
        .iter()
        .any(|blocked| domain == blocked || domain.ends_with(&format!(".{blocked}")))
    {
        return false;
    }

    let path_lower = url.path().to_ascii_lowercase();
    if config
        .blocked_extensions
        .iter()
        .any(|ext| path_lower.ends_with(ext))
    {
        return false;
    }

    // Path either has no extension, or its extension is in the allowed set.
    let basename = path_lower.rsplit('/').next().unwrap_or(&path_lower);
    if basename.contains('.')
        && !config
            .allowed_extensions
            .iter()
            .any(|ext| path_lower.ends_with(ext))
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::default()
    }

    #[test]
    fn rejects_blocked_extension() {
        let mut cfg = config();
        cfg.blocked_extensions.insert(".pdf".to_owned());
        let url = Url::parse("https://example.com/report.pdf").unwrap();
        assert!(!is_allowed(&url, &cfg));
    }

    #[test]
    fn rejects_blocked_domain_and_subdomains() {
        let mut cfg = config();
        cfg.blocked_domains.insert("ads.example.com".to_owned());
        let exact = Url::parse("https://ads.example.com/x").unwrap();
        let sub = Url::parse("https://tracker.ads.example.com/x").unwrap();
        let unrelated = Url::parse("https://example.com/x").unwrap();
        assert!(!is_allowed(&exact, &cfg));
        assert!(!is_allowed(&sub, &cfg));
        assert!(is_allowed(&unrelated, &cfg));
    }

    #[test]
    fn rejects_urls_over_length_cap() {
        let mut cfg = config();
        cfg.max_url_length = 20;
        let url = Url::parse("https://example.com/a-fairly-long-path").unwrap();
        assert!(!is_allowed(&url, &cfg));
    }

    #[test]
    fn rejects_extension_outside_allowed_set() {
        let cfg = config();
        let url = Url::parse("http://a.test/x.bin").unwrap();
        assert!(!is_allowed(&url, &cfg));
    }

    #[test]
    fn allows_extensionless_and_explicitly_allowed_paths() {
        let cfg = config();
        assert!(is_allowed(&Url::parse("https://example.com/about").unwrap(), &cfg));
        assert!(is_allowed(&Url::parse("https://example.com/index.html").unwrap(), &cfg));
    }

    #[test]
    fn allows_plain_http_and_https() {
        let cfg = config();
        assert!(is_allowed(&Url::parse("https://example.com/").unwrap(), &cfg));
        assert!(is_allowed(&Url::parse("http://example.com/").unwrap(), &cfg));
    }
}
