use menu_common::solr::SolrClientConfig;

use crate::error::AppError;

const DEFAULT_SEARCH_CACHE_TTL_SECS: u64 = 300;

/// Application configuration loaded explicitly from environment variables.
///
/// Solr settings come from [`SolrClientConfig::from_env`]. Redis URL is optional; if
/// absent, the server runs without caching.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// Lifetime of cached search results and brand lists.
    pub search_cache_ttl_secs: u64,
    pub solr: SolrClientConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `SOLR_BASE_URL` and the other `SOLR_*` transport settings
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `SEARCH_CACHE_TTL_SECS`: cache lifetime in seconds (default 300)
    pub fn from_env() -> Result<Self, AppError> {
        let solr = SolrClientConfig::from_env();
        validate_base_url(&solr.base_url)?;

        let search_cache_ttl_secs = match std::env::var("SEARCH_CACHE_TTL_SECS") {
            Ok(raw) => parse_ttl(&raw)?,
            Err(_) => DEFAULT_SEARCH_CACHE_TTL_SECS,
        };

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            redis_url,
            search_cache_ttl_secs,
            solr,
        })
    }
}

fn validate_base_url(url: &str) -> Result<(), AppError> {
    let host = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| {
            AppError::Config(format!(
                "SOLR_BASE_URL must start with http:// or https://, got '{url}'"
            ))
        })?;
    if host.is_empty() || host.starts_with('/') {
        return Err(AppError::Config(format!(
            "SOLR_BASE_URL has no host: '{url}'"
        )));
    }
    Ok(())
}

fn parse_ttl(raw: &str) -> Result<u64, AppError> {
    raw.trim().parse::<u64>().map_err(|_| {
        AppError::Config(format!(
            "SEARCH_CACHE_TTL_SECS must be a whole number of seconds, got '{raw}'"
        ))
    })
}
