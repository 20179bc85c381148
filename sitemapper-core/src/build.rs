use anyhow::Context;
use sitemapper_crawler::{ContentNegotiator, Crawler, HttpFetcher, Sitemap};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for a sitemap build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub seed: String,
    /// Crawl depth budget attached to the seed; each hop decrements it.
    pub decay: u32,
    pub workers: usize,
    pub timeout_secs: u64,
    /// Idle retries granted per worker before an empty frontier ends the
    /// crawl.
    pub retries_per_worker: u32,
    /// How long an idle worker sleeps between frontier polls.
    pub idle_sleep: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            seed: String::new(),
            decay: 3,
            workers: 5,
            timeout_secs: 5,
            retries_per_worker: 10,
            idle_sleep: Duration::from_secs(1),
        }
    }
}

/// Crawl `options.seed` and return the finished page adjacency map. This
/// is the one operation the CLI consumes; rendering happens separately.
pub async fn build_sitemap(options: &BuildOptions) -> anyhow::Result<Sitemap> {
    let fetcher =
        HttpFetcher::with_timeout(options.timeout_secs).context("failed to build HTTP client")?;
    let negotiator = ContentNegotiator::new(Arc::new(fetcher));
    let crawler = Crawler::new(negotiator)
        .with_workers(options.workers)
        .with_retries_per_worker(options.retries_per_worker)
        .with_idle_sleep(options.idle_sleep);

    let sitemap = crawler
        .crawl(&options.seed, options.decay)
        .await
        .with_context(|| format!("crawl of {} failed", options.seed))?;

    info!(
        "mapped {} pages starting from {}",
        sitemap.len(),
        options.seed
    );
    Ok(sitemap)
}
