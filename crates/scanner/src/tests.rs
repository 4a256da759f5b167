//! Scan pipeline behavior tests.
//!
//! Ports are stubbed in memory; timing-sensitive tests run on tokio's paused
//! clock so governor assertions are deterministic and instant.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use pipeline::{
    CodeSearcher, CountCache, Keyword, MatchCount, RateLimit, RepoName, SearchError, SearchResult,
    WorkUnit,
};

use crate::governor::RateGovernor;
use crate::scan::Scanner;
use crate::shutdown::ShutdownSignal;

// ------------------------------------------------------------------
// In-memory ports
// ------------------------------------------------------------------

#[derive(Default)]
struct MemoryCache {
    counts: Mutex<HashMap<String, MatchCount>>,
    total: Mutex<Option<u64>>,
    repos: Mutex<Option<Vec<RepoName>>>,
    keywords: Mutex<Option<Vec<Keyword>>>,
}

impl MemoryCache {
    fn seed(&self, key: &str, count: u64) {
        self.counts
            .lock()
            .unwrap()
            .insert(key.to_string(), MatchCount::new(count));
    }

    fn count_entries(&self) -> usize {
        self.counts.lock().unwrap().len()
    }
}

#[async_trait]
impl CountCache for MemoryCache {
    async fn get_count(&self, unit: &WorkUnit) -> Option<MatchCount> {
        self.counts.lock().unwrap().get(&unit.cache_key()).copied()
    }

    async fn put_count(&self, unit: &WorkUnit, count: MatchCount) {
        self.counts.lock().unwrap().insert(unit.cache_key(), count);
    }

    async fn total_repos(&self) -> Option<u64> {
        *self.total.lock().unwrap()
    }

    async fn set_total_repos(&self, total: u64) {
        *self.total.lock().unwrap() = Some(total);
    }

    async fn repo_names(&self) -> Option<Vec<RepoName>> {
        self.repos.lock().unwrap().clone()
    }

    async fn set_repo_names(&self, repos: &[RepoName]) {
        *self.repos.lock().unwrap() = Some(repos.to_vec());
    }

    async fn keywords(&self) -> Option<Vec<Keyword>> {
        self.keywords.lock().unwrap().clone()
    }

    async fn set_keywords(&self, keywords: &[Keyword]) {
        *self.keywords.lock().unwrap() = Some(keywords.to_vec());
    }
}

/// Searcher backed by a fixed `"repo:keyword" -> count` table. Pairs missing
/// from the table fail with an HTTP 422, standing in for a remote error.
struct StubSearcher {
    counts: HashMap<String, u64>,
    calls: AtomicUsize,
}

impl StubSearcher {
    fn new(counts: &[(&str, u64)]) -> Self {
        Self {
            counts: counts
                .iter()
                .map(|(key, count)| (key.to_string(), *count))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeSearcher for StubSearcher {
    async fn match_count(
        &self,
        repo: &RepoName,
        keyword: &Keyword,
    ) -> Result<MatchCount, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.counts.get(&format!("{repo}:{keyword}")) {
            Some(&count) => Ok(MatchCount::new(count)),
            None => Err(SearchError::Status {
                repo: repo.clone(),
                keyword: keyword.clone(),
                status: 422,
            }),
        }
    }
}

// ------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------

fn repo_list(names: &[&str]) -> Vec<RepoName> {
    names.iter().map(|n| RepoName::new(*n).unwrap()).collect()
}

fn keyword_list(words: &[&str]) -> Vec<Keyword> {
    words.iter().map(|w| Keyword::new(*w).unwrap()).collect()
}

async fn drain(mut stream: mpsc::Receiver<SearchResult>) -> Vec<SearchResult> {
    let mut results = Vec::new();
    while let Some(result) = stream.recv().await {
        results.push(result);
    }
    results
}

fn count_of(results: &[SearchResult], repo: &str, keyword: &str) -> Option<u64> {
    results
        .iter()
        .find(|r| r.repo.as_str() == repo && r.keyword.as_str() == keyword)
        .map(|r| r.count.as_u64())
}

const FOUR_PAIRS: &[(&str, u64)] = &[
    ("org/a:foo", 1),
    ("org/a:bar", 2),
    ("org/b:foo", 3),
    ("org/b:bar", 4),
];

// ------------------------------------------------------------------
// Pipeline behavior
// ------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn resolves_every_unit_of_the_cross_product() {
    let cache = Arc::new(MemoryCache::default());
    let searcher = Arc::new(StubSearcher::new(FOUR_PAIRS));
    let scanner = Scanner::new(
        cache.clone(),
        searcher.clone(),
        RateLimit::per_minute(4).unwrap(),
    );

    let mut stream = scanner.start(
        repo_list(&["org/a", "org/b"]),
        keyword_list(&["foo", "bar"]),
        ShutdownSignal::disabled(),
    );

    // Each result must already be visible in the cache by the time it is
    // observed on the stream.
    let mut results = Vec::new();
    while let Some(result) = stream.recv().await {
        let unit = WorkUnit::new(result.repo.clone(), result.keyword.clone());
        assert_eq!(cache.get_count(&unit).await, Some(result.count));
        results.push(result);
    }

    assert_eq!(results.len(), 4);
    assert_eq!(count_of(&results, "org/a", "foo"), Some(1));
    assert_eq!(count_of(&results, "org/a", "bar"), Some(2));
    assert_eq!(count_of(&results, "org/b", "foo"), Some(3));
    assert_eq!(count_of(&results, "org/b", "bar"), Some(4));
    assert_eq!(searcher.calls(), 4);
    assert_eq!(cache.count_entries(), 4);
}

#[tokio::test(start_paused = true)]
async fn cache_hit_bypasses_remote_and_reports_cached_count() {
    let cache = Arc::new(MemoryCache::default());
    cache.seed("org/a:foo", 99);
    let searcher = Arc::new(StubSearcher::new(FOUR_PAIRS));
    let scanner = Scanner::new(
        cache.clone(),
        searcher.clone(),
        RateLimit::per_minute(4).unwrap(),
    );

    let stream = scanner.start(
        repo_list(&["org/a", "org/b"]),
        keyword_list(&["foo", "bar"]),
        ShutdownSignal::disabled(),
    );
    let results = drain(stream).await;

    assert_eq!(results.len(), 4);
    // The seeded pair is answered from the cache, not the stub table.
    assert_eq!(count_of(&results, "org/a", "foo"), Some(99));
    assert_eq!(searcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn second_run_over_warm_cache_makes_no_remote_calls() {
    let cache = Arc::new(MemoryCache::default());
    let repos = repo_list(&["org/a", "org/b"]);
    let words = keyword_list(&["foo", "bar"]);

    let first_searcher = Arc::new(StubSearcher::new(FOUR_PAIRS));
    let scanner = Scanner::new(
        cache.clone(),
        first_searcher.clone(),
        RateLimit::per_minute(4).unwrap(),
    );
    let first =
        drain(scanner.start(repos.clone(), words.clone(), ShutdownSignal::disabled())).await;
    assert_eq!(first_searcher.calls(), 4);

    // Same inputs, fresh searcher: everything must come from the cache.
    let second_searcher = Arc::new(StubSearcher::new(&[]));
    let scanner = Scanner::new(
        cache.clone(),
        second_searcher.clone(),
        RateLimit::per_minute(4).unwrap(),
    );
    let second = drain(scanner.start(repos, words, ShutdownSignal::disabled())).await;

    assert_eq!(second_searcher.calls(), 0);
    assert_eq!(second.len(), first.len());
    for result in &first {
        assert_eq!(
            count_of(&second, result.repo.as_str(), result.keyword.as_str()),
            Some(result.count.as_u64())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn remote_calls_are_token_gated() {
    let cache = Arc::new(MemoryCache::default());
    let searcher = Arc::new(StubSearcher::new(FOUR_PAIRS));
    // 4 per minute: one token every 15 seconds, first token immediate.
    let scanner = Scanner::new(
        cache,
        searcher,
        RateLimit::per_minute(4).unwrap(),
    );

    let started = Instant::now();
    let results = drain(scanner.start(
        repo_list(&["org/a", "org/b"]),
        keyword_list(&["foo", "bar"]),
        ShutdownSignal::disabled(),
    ))
    .await;

    assert_eq!(results.len(), 4);
    // 4 remote calls span at least 3 full periods.
    assert!(started.elapsed() >= Duration::from_secs(45));
}

#[tokio::test(start_paused = true)]
async fn failed_units_are_dropped_without_results() {
    let cache = Arc::new(MemoryCache::default());
    // Only two of the four pairs resolve; the others fail remotely.
    let searcher = Arc::new(StubSearcher::new(&[("org/a:foo", 1), ("org/b:bar", 4)]));
    let scanner = Scanner::new(
        cache.clone(),
        searcher.clone(),
        RateLimit::per_minute(4).unwrap(),
    );

    let results = drain(scanner.start(
        repo_list(&["org/a", "org/b"]),
        keyword_list(&["foo", "bar"]),
        ShutdownSignal::disabled(),
    ))
    .await;

    // Every unit was attempted, the stream still closed, and the failed
    // units left no result and no cache entry behind.
    assert_eq!(searcher.calls(), 4);
    assert_eq!(results.len(), 2);
    assert_eq!(count_of(&results, "org/a", "foo"), Some(1));
    assert_eq!(count_of(&results, "org/b", "bar"), Some(4));
    assert_eq!(cache.count_entries(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_unit_set_closes_the_stream_immediately() {
    let cache = Arc::new(MemoryCache::default());
    let searcher = Arc::new(StubSearcher::new(&[]));
    let scanner = Scanner::new(cache, searcher.clone(), RateLimit::default());

    let mut stream = scanner.start(
        Vec::new(),
        keyword_list(&["foo"]),
        ShutdownSignal::disabled(),
    );

    assert!(stream.recv().await.is_none());
    assert_eq!(searcher.calls(), 0);
}

// ------------------------------------------------------------------
// Governor
// ------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn governor_issues_first_token_immediately() {
    let governor = RateGovernor::new(RateLimit::per_minute(60).unwrap());

    let started = Instant::now();
    governor.acquire().await;

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn governor_spaces_tokens_by_one_period() {
    // 60 per minute: one token per second.
    let governor = RateGovernor::new(RateLimit::per_minute(60).unwrap());

    let started = Instant::now();
    governor.acquire().await;
    governor.acquire().await;
    governor.acquire().await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
}
