//! Codecount GitHub infrastructure adapter.
//!
//! Implements the GitHub-facing traits defined in the [`pipeline`] crate
//! ([`RepositoryLister`], [`CodeSearcher`]) over the REST API.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. All GitHub
//! API details (pagination, authentication headers, query construction) are
//! handled here; the [`pipeline`] crate never sees them. Rate limiting is
//! deliberately *not* handled here — the scan orchestrator owns the token
//! budget and calls [`CodeSearcher::match_count`] at most once per token.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;

use pipeline::{
    CodeSearcher, Keyword, ListingError, MatchCount, OrgName, RepoName, RepositoryLister,
    SearchError, StartupError,
};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Authenticated GitHub REST client.
///
/// One instance serves both repository enumeration and code search; the
/// underlying `reqwest::Client` pools connections and is safe to share
/// across workers.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    /// Creates a client for the public GitHub API.
    pub fn new(token: &str) -> Result<Self, StartupError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a client against an alternate endpoint (GitHub Enterprise, a
    /// local test server).
    pub fn with_base_url(token: &str, base_url: impl Into<String>) -> Result<Self, StartupError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|error| {
            StartupError::HttpClient {
                message: format!("invalid token: {error}"),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );

        // GitHub rejects requests without a User-Agent.
        let http = reqwest::Client::builder()
            .user_agent(concat!("codecount/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|error| StartupError::HttpClient {
                message: error.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Response bodies — only the fields the scan needs.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RepoSummary {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct CodeSearchPage {
    total_count: u64,
}

/// Search qualifier scoping `keyword` to a single repository.
fn search_query(repo: &RepoName, keyword: &Keyword) -> String {
    format!("repo:{repo} {keyword}")
}

#[async_trait]
impl RepositoryLister for GithubClient {
    /// Pages through `/orgs/{org}/repos` until a short page, collecting each
    /// repository's full name.
    async fn list_repos(&self, org: &OrgName) -> Result<Vec<RepoName>, ListingError> {
        let url = format!("{}/orgs/{}/repos", self.base_url, org);
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .http
                .get(&url)
                .query(&[("per_page", PAGE_SIZE as u32), ("page", page)])
                .send()
                .await
                .map_err(|error| ListingError::Transport {
                    org: org.clone(),
                    message: error.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ListingError::Status {
                    org: org.clone(),
                    status: status.as_u16(),
                });
            }

            let batch: Vec<RepoSummary> =
                response.json().await.map_err(|error| ListingError::Transport {
                    org: org.clone(),
                    message: error.to_string(),
                })?;

            let short_page = batch.len() < PAGE_SIZE;
            repos.extend(
                batch
                    .into_iter()
                    .filter_map(|repo| RepoName::new(repo.full_name)),
            );
            if short_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(org = %org, repos = repos.len(), pages = page, "listed organization repositories");
        Ok(repos)
    }
}

#[async_trait]
impl CodeSearcher for GithubClient {
    /// One `/search/code` request; the match count is the response's
    /// `total_count`, newest-indexed first.
    async fn match_count(
        &self,
        repo: &RepoName,
        keyword: &Keyword,
    ) -> Result<MatchCount, SearchError> {
        let url = format!("{}/search/code", self.base_url);
        let query = search_query(repo, keyword);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("sort", "indexed"),
                ("order", "desc"),
                ("per_page", "100"),
            ])
            .send()
            .await
            .map_err(|error| SearchError::Transport {
                repo: repo.clone(),
                keyword: keyword.clone(),
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                repo: repo.clone(),
                keyword: keyword.clone(),
                status: status.as_u16(),
            });
        }

        let body: CodeSearchPage =
            response.json().await.map_err(|error| SearchError::Transport {
                repo: repo.clone(),
                keyword: keyword.clone(),
                message: error.to_string(),
            })?;

        Ok(MatchCount::new(body.total_count))
    }
}
