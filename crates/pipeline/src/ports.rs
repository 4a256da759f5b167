//! Port traits implemented by the infrastructure crates.
//!
//! The scan pipeline depends on these traits only; the `cache` and `github`
//! crates supply the Redis and GitHub REST implementations, and tests supply
//! in-memory stubs. All three are dyn-compatible async traits shared across
//! workers behind `Arc`.

use async_trait::async_trait;

use crate::{Keyword, ListingError, MatchCount, OrgName, RepoName, SearchError, WorkUnit};

/// Key/value store for per-unit match counts and the three scan aggregates.
///
/// The cache is advisory, never a correctness requirement. Every read failure
/// (transport, type mismatch, decode) is indistinguishable from a miss, and
/// every write is best-effort; implementations log failures and move on.
/// Absence must never be treated as "count is zero" — callers recompute.
///
/// Entries have no expiry: once written they persist until the store is
/// externally cleared, so repeated runs reuse prior results.
#[async_trait]
pub trait CountCache: Send + Sync {
    /// Looks up the cached match count for a unit's key.
    async fn get_count(&self, unit: &WorkUnit) -> Option<MatchCount>;

    /// Stores the match count for a unit's key. Best-effort.
    async fn put_count(&self, unit: &WorkUnit, count: MatchCount);

    /// Reads the cached total-repository count.
    async fn total_repos(&self) -> Option<u64>;

    /// Stores the total-repository count. Best-effort.
    async fn set_total_repos(&self, total: u64);

    /// Reads the cached repository name list. Lists round-trip exactly.
    async fn repo_names(&self) -> Option<Vec<RepoName>>;

    /// Stores the repository name list. Best-effort.
    async fn set_repo_names(&self, repos: &[RepoName]);

    /// Reads the cached keyword list. Lists round-trip exactly.
    async fn keywords(&self) -> Option<Vec<Keyword>>;

    /// Stores the keyword list. Best-effort.
    async fn set_keywords(&self, keywords: &[Keyword]);
}

/// Remote code-search API: one repository + one keyword in, a match count out.
///
/// Callers are responsible for rate limiting; implementations perform exactly
/// one remote call per invocation.
#[async_trait]
pub trait CodeSearcher: Send + Sync {
    /// Counts code-search matches for `keyword` within `repo`.
    async fn match_count(
        &self,
        repo: &RepoName,
        keyword: &Keyword,
    ) -> Result<MatchCount, SearchError>;
}

/// Enumeration of every repository belonging to an organization.
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    /// Lists all repository full names (`owner/repo`) in `org`.
    async fn list_repos(&self, org: &OrgName) -> Result<Vec<RepoName>, ListingError>;
}
