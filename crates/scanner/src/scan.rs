//! The rate-limited, cache-aware scan pipeline.
//!
//! Fan-out/fan-in over two bounded channels sized to the full repository ×
//! keyword cross product, so the producer never blocks during normal
//! operation:
//!
//! ```text
//!  producer ──▶ task queue ──▶ worker 1..N ──▶ result queue ──▶ caller
//!                                  │
//!                          cache probe ▸ rate token ▸ remote search
//! ```
//!
//! Each unit resolves exactly once: a cache hit publishes immediately without
//! a token; a miss acquires a token, searches, writes the count back to the
//! cache and then publishes; a failed search is logged and dropped without a
//! result. Results arrive in completion order — callers must not assume any
//! repository or keyword ordering.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use pipeline::{CodeSearcher, CountCache, Keyword, RateLimit, RepoName, SearchResult, WorkUnit};

use crate::governor::RateGovernor;
use crate::shutdown::ShutdownSignal;

/// Drives one scan: task generation, bounded-concurrency dispatch, and
/// result fan-in.
///
/// All collaborators are injected at construction; the scanner holds no
/// ambient state and can be run repeatedly.
pub struct Scanner {
    cache: Arc<dyn CountCache>,
    searcher: Arc<dyn CodeSearcher>,
    limit: RateLimit,
}

impl Scanner {
    /// Creates a scanner over the given cache and search ports.
    ///
    /// The worker pool size equals the rate limit: one worker can be
    /// in-flight per token-issuing period.
    pub fn new(
        cache: Arc<dyn CountCache>,
        searcher: Arc<dyn CodeSearcher>,
        limit: RateLimit,
    ) -> Self {
        Self {
            cache,
            searcher,
            limit,
        }
    }

    /// Starts the pipeline over the repo × keyword cross product and returns
    /// the result stream.
    ///
    /// The stream yields one [`SearchResult`] per completed unit and closes
    /// once every worker has exited — after the task queue is exhausted, or
    /// after in-flight units drain following an interrupt. Failed units are
    /// logged and never appear in the stream.
    pub fn start(
        &self,
        repos: Vec<RepoName>,
        keywords: Vec<Keyword>,
        shutdown: ShutdownSignal,
    ) -> mpsc::Receiver<SearchResult> {
        let unit_count = repos.len() * keywords.len();
        // Channel capacity covers the whole cross product; a zero-unit scan
        // still needs a valid (immediately closing) channel.
        let capacity = unit_count.max(1);
        let (task_tx, task_rx) = mpsc::channel::<WorkUnit>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<SearchResult>(capacity);

        tracing::info!(
            repos = repos.len(),
            keywords = keywords.len(),
            units = unit_count,
            rate_limit = %self.limit,
            "starting scan"
        );

        // Producer: enqueue every unit eagerly, then close the task stream
        // by dropping the sender.
        tokio::spawn(async move {
            for repo in &repos {
                for keyword in &keywords {
                    let unit = WorkUnit::new(repo.clone(), keyword.clone());
                    if task_tx.send(unit).await.is_err() {
                        return;
                    }
                }
            }
        });

        let governor = Arc::new(RateGovernor::new(self.limit));
        let tasks = Arc::new(Mutex::new(task_rx));

        let mut handles = Vec::with_capacity(self.limit.worker_count());
        for id in 0..self.limit.worker_count() {
            let worker = Worker {
                id,
                cache: Arc::clone(&self.cache),
                searcher: Arc::clone(&self.searcher),
                governor: Arc::clone(&governor),
                tasks: Arc::clone(&tasks),
                results: result_tx.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }
        // Workers hold the only remaining result senders; the stream closes
        // when the last worker exits.
        drop(result_tx);

        tokio::spawn(supervise_drain(handles, shutdown));

        result_rx
    }
}

/// Waits for the worker group to drain, then reports shutdown completion if
/// an interrupt was received. In-flight units are never aborted.
async fn supervise_drain(handles: Vec<JoinHandle<()>>, shutdown: ShutdownSignal) {
    for handle in handles {
        if let Err(error) = handle.await {
            tracing::error!(%error, "worker task aborted unexpectedly");
        }
    }
    if shutdown.is_received() {
        println!("Graceful shutdown complete.");
    }
    tracing::info!("scan drained");
}

/// One member of the worker pool.
struct Worker {
    id: usize,
    cache: Arc<dyn CountCache>,
    searcher: Arc<dyn CodeSearcher>,
    governor: Arc<RateGovernor>,
    tasks: Arc<Mutex<mpsc::Receiver<WorkUnit>>>,
    results: mpsc::Sender<SearchResult>,
}

impl Worker {
    /// Pulls units until the task stream is exhausted.
    async fn run(self) {
        tracing::debug!(worker = self.id, "worker started");
        loop {
            // Lock only for the pickup so siblings can pull concurrently
            // while this worker resolves its unit.
            let unit = { self.tasks.lock().await.recv().await };
            let Some(unit) = unit else {
                break;
            };
            if !self.resolve(unit).await {
                break;
            }
        }
        tracing::debug!(worker = self.id, "worker exited");
    }

    /// Resolves one unit. Returns `false` if the result stream is gone and
    /// the worker should stop.
    async fn resolve(&self, unit: WorkUnit) -> bool {
        if let Some(count) = self.cache.get_count(&unit).await {
            tracing::debug!(worker = self.id, key = %unit.cache_key(), %count, "cache hit");
            return self
                .results
                .send(SearchResult::new(unit, count))
                .await
                .is_ok();
        }

        // Cache miss: one rate token per remote call.
        self.governor.acquire().await;

        match self.searcher.match_count(&unit.repo, &unit.keyword).await {
            Ok(count) => {
                // The cache write lands before the result is published, so
                // any get on this key issued after the result is observed
                // returns the same count.
                self.cache.put_count(&unit, count).await;
                self.results
                    .send(SearchResult::new(unit, count))
                    .await
                    .is_ok()
            }
            Err(error) => {
                // Dropped without a result and without retry; the WARN line
                // is the only trace of the failure.
                tracing::warn!(worker = self.id, %error, "search failed; unit dropped");
                true
            }
        }
    }
}
