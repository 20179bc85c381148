use crate::error::{CrawlError, Result};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

pub(crate) fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Extract the deduplicated set of absolute hyperlink targets from an
/// HTML document.
///
/// `base` anchors relative-URL resolution (`../`, protocol-relative and
/// absolute forms all supported) and must itself be http(s), otherwise
/// this fails with [`CrawlError::InvalidScheme`]. Fragments are stripped
/// before dedup, so `#section` variants collapse to a single URL. Links
/// resolving to a non-web scheme (mailto:, ftp:, javascript:, ...) are
/// dropped silently. Malformed HTML never fails; html5ever recovers
/// whatever anchors it can.
pub fn extract_links(html: &str, base: &Url) -> Result<HashSet<String>> {
    if !is_web_scheme(base) {
        return Err(CrawlError::InvalidScheme(base.scheme().to_string()));
    }

    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut links = HashSet::new();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href) else {
            debug!("could not resolve href '{}' against {}", href, base);
            continue;
        };
        resolved.set_fragment(None);
        if is_web_scheme(&resolved) {
            links.insert(resolved.to_string());
        }
    }
    Ok(links)
}
