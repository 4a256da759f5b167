//! Codecount Redis infrastructure adapter.
//!
//! Implements the [`pipeline::CountCache`] trait over Redis. Per-unit match
//! counts live at `"{repo}:{keyword}"` as plain integers; the three scan
//! aggregates live at well-known keys, with the two lists JSON-encoded so
//! they round-trip exactly. Nothing expires: entries persist until the store
//! is externally cleared.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The cache is advisory: after the startup connection
//! check, every failure on this path degrades — reads to a miss, writes to a
//! logged no-op. The [`pipeline`] crate never sees a Redis error.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use pipeline::{CountCache, Keyword, MatchCount, RepoName, StartupError, WorkUnit};

const KEY_TOTAL_REPOS: &str = "total_repos";
const KEY_REPO_NAMES: &str = "repo_names";
const KEY_KEYWORDS: &str = "keywords";

/// Redis-backed [`CountCache`].
///
/// The underlying connection manager multiplexes one connection and is safe
/// to share across all workers without external locking; it reconnects on
/// its own after transient failures.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connects to the store at `addr` and verifies it answers a `PING`.
    ///
    /// `addr` may be a bare `host:port` or a full `redis://` URL. Any
    /// failure here is fatal: the pipeline must not start against an
    /// unreachable store.
    pub async fn connect(addr: &str) -> Result<Self, StartupError> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        };

        let client = redis::Client::open(url).map_err(|error| StartupError::CacheUnreachable {
            message: error.to_string(),
        })?;
        let mut manager =
            ConnectionManager::new(client)
                .await
                .map_err(|error| StartupError::CacheUnreachable {
                    message: error.to_string(),
                })?;

        redis::cmd("PING")
            .query_async::<String>(&mut manager)
            .await
            .map_err(|error| StartupError::CacheUnreachable {
                message: error.to_string(),
            })?;

        Ok(Self { manager })
    }

    async fn read<T: redis::FromRedisValue>(&self, key: &str) -> Option<T> {
        let mut con = self.manager.clone();
        match con.get::<_, Option<T>>(key).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "cache read failed; treating as miss");
                None
            }
        }
    }

    async fn write<T: redis::ToRedisArgs + Send + Sync>(&self, key: &str, value: T) {
        let mut con = self.manager.clone();
        if let Err(error) = con.set::<_, _, ()>(key, value).await {
            tracing::warn!(key, %error, "cache write failed; continuing without it");
        }
    }
}

#[async_trait]
impl CountCache for RedisCache {
    async fn get_count(&self, unit: &WorkUnit) -> Option<MatchCount> {
        self.read::<u64>(&unit.cache_key()).await.map(MatchCount::new)
    }

    async fn put_count(&self, unit: &WorkUnit, count: MatchCount) {
        self.write(&unit.cache_key(), count.as_u64()).await;
    }

    async fn total_repos(&self) -> Option<u64> {
        self.read::<u64>(KEY_TOTAL_REPOS).await
    }

    async fn set_total_repos(&self, total: u64) {
        self.write(KEY_TOTAL_REPOS, total).await;
    }

    async fn repo_names(&self) -> Option<Vec<RepoName>> {
        let json = self.read::<String>(KEY_REPO_NAMES).await?;
        let repos = decode_repo_names(&json);
        if repos.is_none() {
            tracing::warn!(key = KEY_REPO_NAMES, "cached list failed to decode; treating as miss");
        }
        repos
    }

    async fn set_repo_names(&self, repos: &[RepoName]) {
        match encode_strings(repos.iter().map(RepoName::as_str)) {
            Ok(json) => self.write(KEY_REPO_NAMES, json).await,
            Err(error) => tracing::warn!(%error, "failed to encode repository list; not cached"),
        }
    }

    async fn keywords(&self) -> Option<Vec<Keyword>> {
        let json = self.read::<String>(KEY_KEYWORDS).await?;
        let keywords = decode_keywords(&json);
        if keywords.is_none() {
            tracing::warn!(key = KEY_KEYWORDS, "cached list failed to decode; treating as miss");
        }
        keywords
    }

    async fn set_keywords(&self, keywords: &[Keyword]) {
        match encode_strings(keywords.iter().map(Keyword::as_str)) {
            Ok(json) => self.write(KEY_KEYWORDS, json).await,
            Err(error) => tracing::warn!(%error, "failed to encode keyword list; not cached"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate list codec — JSON string arrays, exact round-trip.
// ---------------------------------------------------------------------------

fn encode_strings<'a>(values: impl Iterator<Item = &'a str>) -> serde_json::Result<String> {
    serde_json::to_string(&values.collect::<Vec<_>>())
}

/// Decodes a cached repository list. An unparseable document or an empty
/// entry invalidates the whole list so callers re-enumerate.
fn decode_repo_names(json: &str) -> Option<Vec<RepoName>> {
    let raw: Vec<String> = serde_json::from_str(json).ok()?;
    raw.into_iter().map(RepoName::new).collect()
}

fn decode_keywords(json: &str) -> Option<Vec<Keyword>> {
    let raw: Vec<String> = serde_json::from_str(json).ok()?;
    raw.into_iter().map(Keyword::new).collect()
}
