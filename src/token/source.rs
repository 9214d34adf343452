// Token sources.
// Loads a bearer token from an environment variable or a token broker endpoint.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DashError, Result};

/// Something that can produce a GitHub token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Load a token. `Ok(None)` means this source has nothing to offer.
    async fn load_token(&self) -> Result<Option<String>>;
}

/// Reads the token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvTokenSource {
    var: String,
}

impl EnvTokenSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new("GITHUB_TOKEN")
    }
}

#[async_trait]
impl TokenSource for EnvTokenSource {
    async fn load_token(&self) -> Result<Option<String>> {
        let token = std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        debug!(var = %self.var, found = token.is_some(), "Checked environment for token");
        Ok(token)
    }
}

/// Broker response body.
#[derive(Debug, Deserialize)]
struct BrokerResponse {
    token: Option<String>,
    source: Option<String>,
    message: Option<String>,
}

/// Fetches the token from an HTTP endpoint returning `{token, source}`.
#[derive(Debug, Clone)]
pub struct BrokerTokenSource {
    client: reqwest::Client,
    url: String,
}

impl BrokerTokenSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenSource for BrokerTokenSource {
    async fn load_token(&self) -> Result<Option<String>> {
        debug!(url = %self.url, "Fetching token from broker");

        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<BrokerResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(DashError::TokenBroker(format!(
                "{} - {}",
                status.as_u16(),
                detail
            )));
        }

        let body: BrokerResponse = response.json().await?;
        let token = body
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DashError::TokenBroker("No token received from broker".to_string()))?;

        info!(
            source = body.source.as_deref().unwrap_or("unknown"),
            "Loaded GitHub token from broker"
        );
        Ok(Some(token))
    }
}
