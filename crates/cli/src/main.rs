//! Codecount CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — load `config.yaml` and the `GITHUB_TOKEN` /
//!    `REDIS_ADDR` environment variables; any of them missing aborts before
//!    a single work unit exists.
//! 2. **Wire observability** — configure `tracing-subscriber` with an
//!    `EnvFilter` on stderr and attach a fresh [`pipeline::ScanRunId`] to the
//!    root span so all events from one invocation correlate.
//! 3. **Construct infrastructure** — connect [`cache::RedisCache`] (with its
//!    startup ping) and build [`github::GithubClient`], then inject both into
//!    [`scanner::Scanner`].
//! 4. **Resolve scan inputs** — reuse the cached repository and keyword
//!    lists when both are present, otherwise enumerate the organization and
//!    write the aggregates back.
//! 5. **Print results** — one line per completed unit, in completion order,
//!    until the result stream drains.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use cache::RedisCache;
use github::GithubClient;
use pipeline::{
    CodeSearcher, CountCache, Keyword, RepoName, RepositoryLister, ScanRunId, StartupError,
};
use scanner::{Scanner, ShutdownSignal};

use crate::config::ScanConfig;

const CONFIG_FILE: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let run_id = ScanRunId::new_random();
    run()
        .instrument(tracing::info_span!("scan_run", id = %run_id))
        .await
}

async fn run() -> anyhow::Result<()> {
    let config = ScanConfig::load(CONFIG_FILE).context("loading configuration")?;
    let token = require_env("GITHUB_TOKEN")?;
    let redis_addr = require_env("REDIS_ADDR")?;

    let cache: Arc<dyn CountCache> = Arc::new(
        RedisCache::connect(&redis_addr)
            .await
            .context("cache store must be reachable before the scan starts")?,
    );
    let github = Arc::new(GithubClient::new(&token)?);

    let (repos, keywords) = resolve_inputs(cache.as_ref(), github.as_ref(), &config).await?;

    let searcher: Arc<dyn CodeSearcher> = github;
    let scanner = Scanner::new(Arc::clone(&cache), searcher, config.rate_limit);
    let mut results = scanner.start(repos, keywords, ShutdownSignal::listen());

    while let Some(result) = results.recv().await {
        println!("{result}");
    }

    Ok(())
}

/// Reuses the cached repository and keyword lists when both are present;
/// otherwise enumerates the organization and caches the fresh aggregates.
/// Either way the total-repository line is printed before the scan starts.
async fn resolve_inputs(
    cache: &dyn CountCache,
    lister: &dyn RepositoryLister,
    config: &ScanConfig,
) -> Result<(Vec<RepoName>, Vec<Keyword>), StartupError> {
    if let (Some(repos), Some(keywords)) = (cache.repo_names().await, cache.keywords().await) {
        let total = match cache.total_repos().await {
            Some(total) => total,
            None => {
                // Backfill the aggregate from the list we already trust.
                let total = repos.len() as u64;
                cache.set_total_repos(total).await;
                total
            }
        };
        println!("Total Repositories (from cache): {total}");
        return Ok((repos, keywords));
    }

    let repos = lister.list_repos(&config.org_name).await?;
    println!("Total Repositories: {}", repos.len());
    cache.set_total_repos(repos.len() as u64).await;
    cache.set_repo_names(&repos).await;
    cache.set_keywords(&config.keywords).await;
    Ok((repos, config.keywords.clone()))
}

fn require_env(name: &str) -> Result<String, StartupError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(StartupError::MissingEnv {
            name: name.to_string(),
        }),
    }
}
