//! Shared value types for the scan domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (counts are non-negative integers, the
//! rate limit is strictly positive) and participate in domain computations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Keyword, RepoName};

// ---------------------------------------------------------------------------
// Work units
// ---------------------------------------------------------------------------

/// One (repository, keyword) pair awaiting a match count.
///
/// Units are created once, in bulk, as the cross product of the repository
/// and keyword lists. Identity is value equality on the pair; a unit carries
/// no other state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Repository the search is scoped to.
    pub repo: RepoName,
    /// Keyword to count matches for.
    pub keyword: Keyword,
}

impl WorkUnit {
    /// Creates a work unit for one repository/keyword pair.
    pub fn new(repo: RepoName, keyword: Keyword) -> Self {
        Self { repo, keyword }
    }

    /// Renders the cache key for this unit: `"{repo}:{keyword}"`.
    ///
    /// The key is stable across runs; it is the only coupling between the
    /// pipeline and the cache store's key space.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.repo, self.keyword)
    }
}

// ---------------------------------------------------------------------------
// Match counts
// ---------------------------------------------------------------------------

/// Number of code-search matches reported for one work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchCount(u64);

impl MatchCount {
    /// Creates a [`MatchCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this count is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for MatchCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The completed outcome of one work unit.
///
/// Produced exactly once per unit that completes — via a cache hit or a
/// successful remote search — and never for a unit whose remote call failed.
/// `Display` renders the operator-facing result line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Repository the count applies to.
    pub repo: RepoName,
    /// Keyword the count applies to.
    pub keyword: Keyword,
    /// Number of matches found.
    pub count: MatchCount,
}

impl SearchResult {
    /// Creates a result for a resolved unit.
    pub fn new(unit: WorkUnit, count: MatchCount) -> Self {
        Self {
            repo: unit.repo,
            keyword: unit.keyword,
            count,
        }
    }
}

impl std::fmt::Display for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repo: {}, Keyword: {}, Count: {}",
            self.repo, self.keyword, self.count
        )
    }
}

// ---------------------------------------------------------------------------
// Rate limit
// ---------------------------------------------------------------------------

/// Configured remote-search budget in requests per minute.
///
/// Also fixes the worker pool size: one worker per token-issuing period keeps
/// the pool saturated without queueing ahead of the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit(u32);

impl RateLimit {
    /// Default remote budget: 10 requests per minute.
    pub const DEFAULT_PER_MINUTE: u32 = 10;

    /// Creates a [`RateLimit`], returning `None` if `per_minute` is zero.
    #[must_use]
    pub fn per_minute(per_minute: u32) -> Option<Self> {
        if per_minute == 0 {
            None
        } else {
            Some(Self(per_minute))
        }
    }

    /// Returns the configured requests-per-minute value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Interval between consecutive rate tokens: `1 minute / limit`.
    pub fn period(self) -> Duration {
        Duration::from_secs(60) / self.0
    }

    /// Number of concurrent workers paired with this limit.
    pub fn worker_count(self) -> usize {
        self.0 as usize
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self(Self::DEFAULT_PER_MINUTE)
    }
}

impl std::fmt::Display for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/min", self.0)
    }
}
