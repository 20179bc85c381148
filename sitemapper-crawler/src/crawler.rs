use crate::error::{CrawlError, Result};
use crate::fetch::ContentNegotiator;
use crate::scope::HostScope;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// Adjacency map from crawled page to its in-scope outgoing links.
pub type Sitemap = HashMap<String, HashSet<String>>;

const DEFAULT_WORKERS: usize = 5;
const DEFAULT_RETRIES_PER_WORKER: u32 = 10;
const DEFAULT_IDLE_SLEEP: Duration = Duration::from_secs(1);

/// Everything the workers share, behind one mutex so that the
/// check-ledger / claim / enqueue sequence is observed as a single step
/// relative to the other workers.
struct CrawlState {
    /// Pending (url, decay) pairs, FIFO.
    frontier: VecDeque<(String, u32)>,
    /// Highest decay at which each URL has been processed.
    ledger: HashMap<String, u32>,
    sitemap: Sitemap,
    /// Shared idle budget; hitting zero while the frontier stays empty
    /// ends the crawl.
    retries_left: u32,
    running: bool,
}

impl CrawlState {
    fn new() -> Self {
        Self {
            frontier: VecDeque::new(),
            ledger: HashMap::new(),
            sitemap: Sitemap::new(),
            retries_left: 0,
            running: true,
        }
    }
}

/// Depth-bounded breadth-first crawler over a pool of async workers.
///
/// Each frontier entry carries a decay: the remaining depth budget. A
/// page's outgoing edges are recorded even when its decay has hit the
/// floor; only enqueuing further children is gated on `decay > 1`. A URL
/// is revisited only when a dequeued entry carries strictly more decay
/// than the ledger has seen for it, which can grow its edge set across
/// visits (edges are append-only within a run).
pub struct Crawler {
    negotiator: Arc<ContentNegotiator>,
    workers: usize,
    retries_per_worker: u32,
    idle_sleep: Duration,
    state: Arc<Mutex<CrawlState>>,
}

impl Crawler {
    pub fn new(negotiator: ContentNegotiator) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
            workers: DEFAULT_WORKERS,
            retries_per_worker: DEFAULT_RETRIES_PER_WORKER,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            state: Arc::new(Mutex::new(CrawlState::new())),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retries_per_worker(mut self, retries: u32) -> Self {
        self.retries_per_worker = retries.max(2);
        self
    }

    /// How long an idle worker sleeps before re-polling the frontier.
    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    /// Crawl from `seed` with the given initial decay and return the
    /// finished sitemap. The crawl ends when the shared idle budget runs
    /// out with an empty frontier, or after [`Crawler::stop`].
    pub async fn crawl(&self, seed: &str, decay: u32) -> Result<Sitemap> {
        let seed_url =
            Url::parse(seed).map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", seed, e)))?;
        let scope = HostScope::from_seed(&seed_url);
        let max_retries = self.workers as u32 * self.retries_per_worker;

        {
            let mut state = self.state.lock().await;
            state.frontier.push_back((seed_url.to_string(), decay));
            state.retries_left = max_retries;
        }

        info!(
            "starting crawl of {} with {} workers, decay {}",
            seed_url, self.workers, decay
        );

        let mut handles = Vec::new();
        for worker_id in 0..self.workers {
            let state = self.state.clone();
            let negotiator = self.negotiator.clone();
            let scope = scope.clone();
            let idle_sleep = self.idle_sleep;
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, state, negotiator, scope, max_retries, idle_sleep).await;
            }));
        }
        for handle in handles {
            handle.await?;
        }

        let state = self.state.lock().await;
        info!("crawl complete: {} pages mapped", state.sitemap.len());
        Ok(state.sitemap.clone())
    }

    /// Ask the workers to stop. In-flight page fetches finish normally;
    /// the flag is observed between loop iterations.
    pub async fn stop(&self) {
        self.state.lock().await.running = false;
    }
}

async fn worker_loop(
    worker_id: usize,
    state: Arc<Mutex<CrawlState>>,
    negotiator: Arc<ContentNegotiator>,
    scope: HostScope,
    max_retries: u32,
    idle_sleep: Duration,
) {
    debug!("worker {} started", worker_id);

    loop {
        let mut guard = state.lock().await;
        if !guard.running || guard.retries_left == 0 {
            break;
        }

        let Some((url, decay)) = guard.frontier.pop_front() else {
            guard.retries_left -= 1;
            debug!(
                "worker {}: frontier empty, {} idle retries left",
                worker_id, guard.retries_left
            );
            drop(guard);
            tokio::time::sleep(idle_sleep).await;
            continue;
        };
        guard.retries_left = max_retries;

        if decay < 1 {
            debug!("worker {}: dropping {} with exhausted decay", worker_id, url);
            continue;
        }

        // Revisit only when this entry carries strictly more remaining
        // depth than the ledger has recorded for the URL.
        if guard.ledger.get(&url).is_some_and(|&seen| seen >= decay) {
            debug!("worker {}: {} already explored at decay >= {}", worker_id, url, decay);
            continue;
        }

        // Claim the URL at this decay before releasing the lock so no
        // other worker fetches it concurrently at this depth or below.
        guard.ledger.insert(url.clone(), decay);
        drop(guard);

        debug!("worker {}: processing {} at decay {}", worker_id, url, decay);
        let discovered = negotiator.fetch_and_extract(&url).await;

        let mut in_scope = Vec::new();
        for link in discovered {
            match Url::parse(&link) {
                Ok(parsed) if scope.allows(&parsed) => in_scope.push(link),
                _ => debug!("worker {}: dropping out-of-scope link {}", worker_id, link),
            }
        }

        let mut guard = state.lock().await;
        // Record the edge set even at the decay floor so leaf pages still
        // appear in the graph; union with any earlier visit's edges.
        let edges = guard.sitemap.entry(url).or_default();
        for link in &in_scope {
            edges.insert(link.clone());
        }
        if decay > 1 {
            for link in in_scope {
                debug!("worker {}: queuing {} at decay {}", worker_id, link, decay - 1);
                guard.frontier.push_back((link, decay - 1));
            }
        }
    }

    debug!("worker {} finished", worker_id);
}
