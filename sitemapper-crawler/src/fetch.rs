use crate::error::Result;
use crate::extract::{extract_links, is_web_scheme};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Response metadata from a lightweight HEAD probe.
pub struct FetchedHeaders {
    pub headers: HeaderMap,
    /// Where the request actually landed after redirects.
    pub final_url: Url,
}

/// A downloaded response body plus the URL it actually came from after
/// redirects.
pub struct FetchedBody {
    pub body: String,
    pub final_url: Url,
}

/// The two HTTP operations the crawl core needs. Implemented over reqwest
/// in production; tests substitute an in-memory double.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_headers(&self, url: &Url) -> Result<FetchedHeaders>;
    async fn fetch_body(&self, url: &Url) -> Result<FetchedBody>;
}

/// reqwest-backed [`Fetcher`] with a bounded timeout and transparent
/// redirect following.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sitemapper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_headers(&self, url: &Url) -> Result<FetchedHeaders> {
        let response = self.client.head(url.clone()).send().await?;
        Ok(FetchedHeaders {
            headers: response.headers().clone(),
            final_url: response.url().clone(),
        })
    }

    async fn fetch_body(&self, url: &Url) -> Result<FetchedBody> {
        let response = self.client.get(url.clone()).send().await?;
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(FetchedBody { body, final_url })
    }
}

/// Split a Content-Type value of the exact shape `text/html; charset=<cs>`.
/// Anything else, including a bare `text/html`, is rejected.
fn split_content_type(value: &str) -> Option<&str> {
    let (media, rest) = value.split_once(';')?;
    let charset = rest.trim_start().strip_prefix("charset=")?;
    (media == "text/html").then_some(charset)
}

fn is_charset_supported(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("us-ascii") || charset.eq_ignore_ascii_case("utf-8")
}

/// Whether a Content-Type header value advertises HTML we can parse.
pub fn is_content_type_supported(value: &str) -> bool {
    split_content_type(value)
        .map(is_charset_supported)
        .unwrap_or(false)
}

/// Decides whether a URL is worth fetching via a HEAD probe and a
/// Content-Type gate, then downloads it and extracts its links.
#[derive(Clone)]
pub struct ContentNegotiator {
    fetcher: Arc<dyn Fetcher>,
}

impl ContentNegotiator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Probe `url` and, when it advertises parseable HTML, download it and
    /// return its outgoing links. Every failure path degrades to an empty
    /// set; a single unreachable or uninteresting page never stops a crawl.
    pub async fn fetch_and_extract(&self, url: &str) -> HashSet<String> {
        match self.try_fetch_and_extract(url).await {
            Ok(links) => links,
            Err(err) => {
                warn!("giving up on {}: {}", url, err);
                HashSet::new()
            }
        }
    }

    async fn try_fetch_and_extract(&self, url: &str) -> Result<HashSet<String>> {
        let Ok(parsed) = Url::parse(url) else {
            debug!("skipping unparseable URL {}", url);
            return Ok(HashSet::new());
        };
        if !is_web_scheme(&parsed) {
            debug!("skipping non-web URL {}", url);
            return Ok(HashSet::new());
        }

        let probe = self.fetcher.fetch_headers(&parsed).await?;
        let supported = probe
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(is_content_type_supported)
            .unwrap_or(false);
        if !supported {
            debug!("skipping {}: missing or unsupported Content-Type", url);
            return Ok(HashSet::new());
        }

        let response = self.fetcher.fetch_body(&parsed).await?;
        // Relative links resolve against where the redirects landed, not
        // where the request started.
        extract_links(&response.body, &response.final_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use reqwest::header::HeaderValue;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn charset_matrix() {
        assert!(is_content_type_supported("text/html; charset=us-ascii"));
        assert!(is_content_type_supported("text/html; charset=US-ASCII"));
        assert!(is_content_type_supported("text/html; charset=utf-8"));
        assert!(is_content_type_supported("text/html; charset=UTF-8"));
        assert!(!is_content_type_supported("text/html"));
        assert!(!is_content_type_supported("text/html; charset=iso-646"));
        assert!(!is_content_type_supported("text/html; charset=KOI8-R"));
        assert!(!is_content_type_supported("text/plain; charset=utf-8"));
        assert!(!is_content_type_supported("application/json; charset=utf-8"));
    }

    /// In-memory fetcher double: URL -> (Content-Type, body), counting
    /// body fetches so tests can assert the HEAD gate short-circuits.
    struct StubFetcher {
        pages: HashMap<String, (&'static str, &'static str)>,
        body_fetches: AtomicUsize,
    }

    impl StubFetcher {
        fn new(pages: HashMap<String, (&'static str, &'static str)>) -> Self {
            Self {
                pages,
                body_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch_headers(&self, url: &Url) -> Result<FetchedHeaders> {
            let (content_type, _) = self
                .pages
                .get(url.as_str())
                .ok_or_else(|| CrawlError::InvalidUrl(url.to_string()))?;
            let mut headers = HeaderMap::new();
            if !content_type.is_empty() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            Ok(FetchedHeaders {
                headers,
                final_url: url.clone(),
            })
        }

        async fn fetch_body(&self, url: &Url) -> Result<FetchedBody> {
            self.body_fetches.fetch_add(1, Ordering::SeqCst);
            let (_, body) = self
                .pages
                .get(url.as_str())
                .ok_or_else(|| CrawlError::InvalidUrl(url.to_string()))?;
            Ok(FetchedBody {
                body: body.to_string(),
                final_url: url.clone(),
            })
        }
    }

    fn negotiator_for(fetcher: Arc<StubFetcher>) -> ContentNegotiator {
        ContentNegotiator::new(fetcher)
    }

    #[tokio::test]
    async fn extracts_links_from_supported_html() {
        let fetcher = Arc::new(StubFetcher::new(HashMap::from([(
            "https://example.com/".to_string(),
            (
                "text/html; charset=utf-8",
                r#"<a href="/a">a</a><a href="/b">b</a>"#,
            ),
        )])));
        let links = negotiator_for(fetcher).fetch_and_extract("https://example.com/").await;
        assert_eq!(
            links,
            HashSet::from([
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn plain_text_page_never_triggers_a_body_fetch() {
        let fetcher = Arc::new(StubFetcher::new(HashMap::from([(
            "https://example.com/robots".to_string(),
            ("text/plain", "not html"),
        )])));
        let links = negotiator_for(fetcher.clone())
            .fetch_and_extract("https://example.com/robots")
            .await;
        assert!(links.is_empty());
        assert_eq!(fetcher.body_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_skipped() {
        let fetcher = Arc::new(StubFetcher::new(HashMap::from([(
            "https://example.com/mystery".to_string(),
            ("", "<a href='/x'>x</a>"),
        )])));
        let links = negotiator_for(fetcher.clone())
            .fetch_and_extract("https://example.com/mystery")
            .await;
        assert!(links.is_empty());
        assert_eq!(fetcher.body_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_web_scheme_is_rejected_without_any_fetch() {
        let fetcher = Arc::new(StubFetcher::new(HashMap::new()));
        let links = negotiator_for(fetcher)
            .fetch_and_extract("ftp://example.com/files")
            .await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_no_links() {
        // Unknown URL makes the stub fail both operations
        let fetcher = Arc::new(StubFetcher::new(HashMap::new()));
        let links = negotiator_for(fetcher)
            .fetch_and_extract("https://unreachable.example.com/")
            .await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn links_resolve_against_the_redirect_target() {
        struct RedirectingFetcher;

        #[async_trait]
        impl Fetcher for RedirectingFetcher {
            async fn fetch_headers(&self, _url: &Url) -> Result<FetchedHeaders> {
                let mut headers = HeaderMap::new();
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                Ok(FetchedHeaders {
                    headers,
                    final_url: Url::parse("https://example.com/moved/here").unwrap(),
                })
            }

            async fn fetch_body(&self, _url: &Url) -> Result<FetchedBody> {
                Ok(FetchedBody {
                    body: r#"<a href="child">child</a>"#.to_string(),
                    final_url: Url::parse("https://example.com/moved/here").unwrap(),
                })
            }
        }

        let negotiator = ContentNegotiator::new(Arc::new(RedirectingFetcher));
        let links = negotiator.fetch_and_extract("https://example.com/old").await;
        assert_eq!(
            links,
            HashSet::from(["https://example.com/moved/child".to_string()])
        );
    }
}
