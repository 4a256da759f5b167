//! YAML configuration loading for the scan.
//!
//! The file supplies the organization to enumerate, the keywords to count,
//! and optionally the remote-search rate budget. Anything wrong with it is a
//! fatal [`StartupError`]; the pipeline never starts on a bad config.

use serde::Deserialize;

use pipeline::{Keyword, OrgName, RateLimit, StartupError};

/// Raw on-disk shape; validated into [`ScanConfig`] before use.
#[derive(Debug, Deserialize)]
struct RawConfig {
    org_name: String,
    keywords: Vec<String>,
    #[serde(default = "default_rate_limit")]
    rate_limit: u32,
}

fn default_rate_limit() -> u32 {
    RateLimit::DEFAULT_PER_MINUTE
}

/// Validated scan configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Organization whose repositories are enumerated.
    pub org_name: OrgName,
    /// Keywords to count matches for in every repository.
    pub keywords: Vec<Keyword>,
    /// Remote-search budget; also the worker pool size.
    pub rate_limit: RateLimit,
}

impl ScanConfig {
    /// Reads and validates the configuration file at `path`.
    pub fn load(path: &str) -> Result<Self, StartupError> {
        let data = std::fs::read_to_string(path).map_err(|error| StartupError::Config {
            message: format!("cannot read {path}: {error}"),
        })?;
        Self::parse(&data)
    }

    fn parse(data: &str) -> Result<Self, StartupError> {
        let raw: RawConfig =
            serde_yaml::from_str(data).map_err(|error| StartupError::Config {
                message: error.to_string(),
            })?;

        let org_name = OrgName::new(raw.org_name).ok_or_else(|| StartupError::Config {
            message: "org_name must not be empty".to_string(),
        })?;

        let keywords = raw
            .keywords
            .into_iter()
            .map(Keyword::new)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| StartupError::Config {
                message: "keywords must not contain empty entries".to_string(),
            })?;

        let rate_limit =
            RateLimit::per_minute(raw.rate_limit).ok_or_else(|| StartupError::Config {
                message: "rate_limit must be at least 1 request per minute".to_string(),
            })?;

        Ok(Self {
            org_name,
            keywords,
            rate_limit,
        })
    }
}
