use std::time::Duration;

use async_trait::async_trait;
use earlybird_core::{SiteClient, TransportError};
use reqwest::{header, Url};
use tracing::{debug, warn};

use crate::app_config::SiteConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Invalid base URL {0:?}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// `SiteClient` over one shared `reqwest` client.
///
/// The cookie store is what ties the discovered form targets to the session that
/// produced them, so every request of a run must go through the same instance.
#[derive(Clone)]
pub struct HttpSiteClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSiteClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ClientBuildError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientBuildError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(site: &SiteConfig) -> Result<Self, ClientBuildError> {
        Self::new(
            &site.base_url,
            &site.user_agent,
            Duration::from_secs(site.request_timeout_seconds),
        )
    }

    fn url_for(&self, target: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(target.trim())
            .map_err(|_| TransportError::InvalidTarget(target.to_string()))
    }

    async fn read(&self, url: &Url, response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| classify(url, e))?;

        if !status.is_success() {
            if body.trim().is_empty() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            // The page may still say something useful, e.g. the error page.
            warn!("{} answered {}, parsing the body anyway", url, status);
        }

        Ok(body)
    }
}

#[async_trait]
impl SiteClient for HttpSiteClient {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        let url = self.url_for(path)?;
        debug!("GET to {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        self.read(&url, response).await
    }

    async fn post_form(
        &self,
        target: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError> {
        let url = self.url_for(target)?;
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        debug!("POST to {} fields={:?}", url, names);

        let response = self
            .client
            .post(url.clone())
            .header(header::ACCEPT, "text/html")
            .form(fields)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        self.read(&url, response).await
    }
}

fn classify(url: &Url, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { url: url.to_string() }
    } else if err.is_body() || err.is_decode() {
        TransportError::Body {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Connect {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
