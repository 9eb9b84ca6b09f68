/// HTTP transport to the Solr core holding the menu.
///
/// Reads (select, facets) retry transient failures with capped exponential backoff.
/// Counter updates are never retried: an increment that timed out may still have been
/// applied, and a retry would count it twice.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::CommonError;
use crate::model::{BrandCount, Counter, RawDocument};
use crate::normalize::{parse_brand_facets, parse_select_response};
use crate::query::{QueryDescriptor, DEFAULT_ROWS, MATCH_ALL};

#[derive(Clone, Debug)]
pub struct SolrClientConfig {
    /// Core URL, e.g. `http://localhost:8983/solr/fastfood_menu`.
    pub base_url: String,
    /// Request handler used for searches, relative to the core.
    pub search_handler: String,
    /// Page size for every search that does not set its own.
    pub rows: u32,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl SolrClientConfig {
    /// Defaults for everything except the core URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            search_handler: "select".to_string(),
            rows: DEFAULT_ROWS,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2_000),
            max_error_body_bytes: 8 * 1024,
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("SOLR_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8983/solr/fastfood_menu".to_string());
        let defaults = Self::new(&base_url);

        let search_handler = std::env::var("SOLR_SEARCH_HANDLER")
            .ok()
            .map(|s| s.trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.search_handler);

        let rows = env_parse::<u32>("SOLR_ROWS")
            .filter(|&n| n > 0)
            .unwrap_or(defaults.rows);

        let timeout = env_parse::<u64>("SOLR_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = env_parse::<u32>("SOLR_MAX_RETRIES").unwrap_or(defaults.max_retries);

        let initial_backoff = env_parse::<u64>("SOLR_RETRY_INITIAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_backoff);

        let max_backoff = env_parse::<u64>("SOLR_RETRY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);

        let max_error_body_bytes =
            env_parse::<usize>("SOLR_MAX_ERROR_BODY_BYTES").unwrap_or(defaults.max_error_body_bytes);

        Self {
            search_handler,
            rows,
            timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[derive(Clone)]
pub struct SolrClient {
    config: SolrClientConfig,
    http: reqwest::Client,
}

impl SolrClient {
    pub fn new(config: SolrClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("menu-search")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SolrClientConfig {
        &self.config
    }

    /// Run a search and return the raw documents of the single result page.
    pub async fn search(&self, query: &QueryDescriptor) -> Result<Vec<RawDocument>, CommonError> {
        let params = query.to_params();
        debug!(?params, handler = %self.config.search_handler, "solr search");
        let body = self.get_json(&self.config.search_handler, &params).await?;
        let docs = parse_select_response(body);
        debug!(docs = docs.len(), "solr search returned");
        Ok(docs)
    }

    /// Brand names with document counts, as faceted by Solr.
    pub async fn brand_facets(&self) -> Result<Vec<BrandCount>, CommonError> {
        let params = vec![
            ("q", MATCH_ALL.to_string()),
            ("wt", "json".to_string()),
            ("rows", "0".to_string()),
            ("facet", "true".to_string()),
            ("facet.field", "brand".to_string()),
        ];
        let body = self.get_json("select", &params).await?;
        Ok(parse_brand_facets(&body))
    }

    /// Atomically add one to `counter` on the document `product_id`, committing immediately.
    pub async fn increment_counter(
        &self,
        product_id: &str,
        counter: Counter,
    ) -> Result<(), CommonError> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(CommonError::MissingProductId);
        }

        let url = format!("{}/update", self.config.base_url);
        let mut doc = serde_json::Map::new();
        doc.insert("id".to_string(), Value::String(product_id.to_string()));
        doc.insert(counter.field().to_string(), json!({ "inc": 1 }));
        let payload = Value::Array(vec![Value::Object(doc)]);

        let resp = self
            .http
            .post(&url)
            .query(&[("commit", "true"), ("wt", "json")])
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await?;
        let body: UpdateResponse =
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await?;

        match body.response_header.and_then(|h| h.status) {
            Some(status) if status != 0 => Err(CommonError::UpdateRejected { status }),
            _ => {
                info!(product_id, counter = counter.field(), "counter incremented");
                Ok(())
            }
        }
    }

    async fn get_json(
        &self,
        handler: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, CommonError> {
        let url = format!("{}/{}", self.config.base_url, handler);
        self.request_with_retry(|| async {
            let resp = self
                .http
                .get(&url)
                .query(params)
                .timeout(self.config.timeout)
                .send()
                .await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    async fn parse_json_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, CommonError> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        let body = read_limited_text(resp, max_error_body_bytes).await;
        Err(CommonError::Upstream { status, body })
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CommonError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !e.is_transient() {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "solr request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "responseHeader")]
    response_header: Option<ResponseHeader>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    status: Option<i64>,
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    (now.subsec_nanos() as u64) % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read solr error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_backoff_is_capped() {
        let initial = Duration::from_millis(200);
        let max = Duration::from_millis(1_000);
        let first = backoff_delay(initial, max, 0);
        assert!(first >= initial && first <= Duration::from_millis(250));
        let late = backoff_delay(initial, max, 30);
        assert!(late >= max && late <= Duration::from_millis(1_250));
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = SolrClientConfig::new("http://solr:8983/solr/menu/");
        assert_eq!(config.base_url, "http://solr:8983/solr/menu");
        assert_eq!(config.rows, DEFAULT_ROWS);
        assert_eq!(config.search_handler, "select");
    }

    #[test]
    fn test_upstream_5xx_is_transient() {
        let err = CommonError::Upstream {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        assert!(err.is_transient());
        let err = CommonError::Upstream {
            status: StatusCode::BAD_REQUEST,
            body: String::new(),
        };
        assert!(!err.is_transient());
        assert!(!CommonError::MissingProductId.is_transient());
    }

    #[tokio::test]
    async fn test_blank_product_id_is_rejected_without_request() {
        let client = SolrClient::new(SolrClientConfig::new("http://127.0.0.1:9")).unwrap();
        let err = client
            .increment_counter("   ", Counter::Likes)
            .await
            .unwrap_err();
        assert!(matches!(err, CommonError::MissingProductId));
    }
}
