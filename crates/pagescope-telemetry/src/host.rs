//! Host extraction for resource URLs

use url::Url;

/// Lowercased host of a URL, or `None` for URLs without one (data:, about:, relative)
pub fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether `host` belongs to the navigated `page_host`.
///
/// `www.` is ignored on both sides and subdomains of the page host count
/// as the same site (`cdn.example.com` is first-party for `example.com`).
pub fn is_same_site(host: &str, page_host: &str) -> bool {
    let host = strip_www(host);
    let page = strip_www(page_host);
    if page.is_empty() {
        return false;
    }
    host == page || host.ends_with(&format!(".{}", page))
}
