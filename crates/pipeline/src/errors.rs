//! Error taxonomy for the scan pipeline.
//!
//! Three categories with distinct propagation rules:
//!
//! - [`StartupError`] — fatal. Raised before any work unit is created;
//!   aborts the process. No partial pipeline is ever started.
//! - [`ListingError`] — repository enumeration failure. Only occurs during
//!   startup (listing is never retried mid-run), so it escalates into
//!   [`StartupError`].
//! - [`SearchError`] — a remote code-search failure for a single unit. Never
//!   fatal: the unit is logged and dropped, no result is produced, and the
//!   pipeline keeps draining.
//!
//! Cache failures have no error type at all: the [`crate::CountCache`] port
//! is fail-open and degrades every failure to a miss (reads) or a logged
//! no-op (writes).

use thiserror::Error;

use crate::{Keyword, OrgName, RepoName};

// ---------------------------------------------------------------------------
// Per-unit search errors
// ---------------------------------------------------------------------------

/// A remote code-search call failed for one work unit.
///
/// The unit is dropped without a result and is not retried; the error is
/// surfaced only as a WARN log line.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request could not be sent or the response body could not be read.
    #[error("searching '{keyword}' in '{repo}' failed: {message}")]
    Transport {
        /// Repository the failed search was scoped to.
        repo: RepoName,
        /// Keyword of the failed search.
        keyword: Keyword,
        /// Transport-level failure description.
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("searching '{keyword}' in '{repo}' returned HTTP {status}")]
    Status {
        /// Repository the failed search was scoped to.
        repo: RepoName,
        /// Keyword of the failed search.
        keyword: Keyword,
        /// HTTP status code returned by the API.
        status: u16,
    },
}

// ---------------------------------------------------------------------------
// Repository listing errors
// ---------------------------------------------------------------------------

/// Repository enumeration for the organization failed.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The request could not be sent or the response body could not be read.
    #[error("listing repositories for '{org}' failed: {message}")]
    Transport {
        /// Organization whose repositories were being listed.
        org: OrgName,
        /// Transport-level failure description.
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("listing repositories for '{org}' returned HTTP {status}")]
    Status {
        /// Organization whose repositories were being listed.
        org: OrgName,
        /// HTTP status code returned by the API.
        status: u16,
    },
}

// ---------------------------------------------------------------------------
// Fatal startup errors
// ---------------------------------------------------------------------------

/// Conditions that abort the process before any work unit is created.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configuration file is unreadable or unparseable.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A required environment variable is missing or empty.
    #[error("{name} environment variable is not set")]
    MissingEnv {
        /// Name of the missing variable.
        name: String,
    },

    /// The cache store could not be reached during startup.
    ///
    /// Mid-run cache failures degrade to misses instead; only the initial
    /// connection check is fatal.
    #[error("could not connect to cache store: {message}")]
    CacheUnreachable {
        /// Connection failure description.
        message: String,
    },

    /// The HTTP client for the remote API could not be constructed.
    #[error("could not build remote API client: {message}")]
    HttpClient {
        /// Client construction failure description.
        message: String,
    },

    /// Repository enumeration failed before the pipeline started.
    #[error(transparent)]
    Listing(#[from] ListingError),
}
