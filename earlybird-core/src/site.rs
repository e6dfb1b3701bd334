use async_trait::async_trait;

use crate::FailureSeverity;

/// Transport to the airline site. Paths and targets are relative to the site root.
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// Fetch a page.
    async fn get(&self, path: &str) -> Result<String, TransportError>;

    /// Submit `application/x-www-form-urlencoded` fields to a server-supplied target.
    async fn post_form(
        &self,
        target: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("{url} answered {status} without a body")]
    Status { url: String, status: u16 },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
    #[error("Cannot build a request URL from target {0:?}")]
    InvalidTarget(String),
}

impl TransportError {
    /// Slow answers are retried; anything else means the site or the network is down.
    pub fn severity(&self) -> FailureSeverity {
        match self {
            TransportError::Timeout { .. } => FailureSeverity::Retry,
            TransportError::Connect { .. }
            | TransportError::Status { .. }
            | TransportError::Body { .. }
            | TransportError::InvalidTarget(_) => FailureSeverity::Abort,
        }
    }
}
