/// Error types shared across the menu search crates.
///
/// These cover the Solr transport and counter mutations. Query
/// construction, normalization and local filtering never fail and have no variants here.
/// Binary crates define their own error type and wrap `CommonError` via `#[from]`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("solr request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid solr response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("solr returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },

    #[error("solr rejected update: responseHeader.status={status}")]
    UpdateRejected { status: i64 },

    #[error("product id is required")]
    MissingProductId,
}

impl CommonError {
    /// Whether a failed read request may be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            CommonError::Request(e) => e.is_timeout() || e.is_connect(),
            CommonError::Upstream { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}
