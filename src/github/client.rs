// GitHub API HTTP client.
// Handles optional authentication, anonymous fallback, and rate limit tracking.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{DashError, Result};
use crate::token::TokenStore;

use super::pagination::next_page_url;
use super::types::{RateLimitInfo, User};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Whether requests currently carry a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Authenticated,
    Anonymous,
}

impl AuthMode {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthMode::Authenticated)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Authenticated => "Authenticated",
            AuthMode::Anonymous => "Public API",
        }
    }
}

/// One decoded response page.
#[derive(Debug, Clone)]
pub struct Page {
    pub body: Value,
    /// URL of the `rel="next"` page, if any.
    pub next: Option<String>,
}

/// GitHub API client with optional token and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    api_base: String,
    tokens: Arc<dyn TokenStore>,
    rate_limit: Mutex<Option<RateLimitInfo>>,
}

impl GitHubClient {
    /// Create a client against `api_base`, reading tokens from `tokens`.
    pub fn new(api_base: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("repodash"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(DashError::Api)?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
            rate_limit: Mutex::new(None),
        })
    }

    /// Absolute URL for an API path such as `/repos/o/r/pulls`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Rate limit from the most recent response, if any request was made.
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        *self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current authentication mode.
    pub fn auth_mode(&self) -> AuthMode {
        if self.tokens.get().is_some() {
            AuthMode::Authenticated
        } else {
            AuthMode::Anonymous
        }
    }

    /// Store a new token; subsequent requests are authenticated.
    pub fn set_token(&self, token: &str) -> Result<()> {
        self.tokens.set(token)?;
        info!("GitHub token stored");
        Ok(())
    }

    /// Drop the stored token and the rate limit snapshot taken with it.
    pub fn clear_token(&self) -> Result<()> {
        self.tokens.clear()?;
        *self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!("GitHub token cleared, using public API");
        Ok(())
    }

    /// GET a single page.
    ///
    /// A 401 while authenticated clears the stored token and retries the same
    /// URL once without it.
    pub async fn get_page(&self, url: &str) -> Result<Page> {
        let token = self.tokens.get();

        match self.send(url, token.as_deref()).await {
            Err(DashError::Unauthorized) if token.is_some() => {
                warn!(url, "GitHub token rejected, clearing it and retrying anonymously");
                if let Err(e) = self.tokens.clear() {
                    warn!(error = %e, "Failed to clear rejected token");
                }
                self.send(url, None).await
            }
            result => result,
        }
    }

    /// Check a candidate token against `/user` without storing it.
    pub async fn validate_token(&self, token: &str) -> Result<User> {
        let page = self.send(&self.url("/user"), Some(token)).await?;
        let user: User = serde_json::from_value(page.body)?;
        Ok(user)
    }

    async fn send(&self, url: &str, token: Option<&str>) -> Result<Page> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await.map_err(DashError::Api)?;
        let rate_limit = self.update_rate_limit(&response);
        debug!(
            url,
            status = response.status().as_u16(),
            remaining = rate_limit.remaining,
            "GitHub response"
        );

        self.check_response(response, rate_limit, token.is_some())
            .await
    }

    /// Record rate limit headers; missing or malformed values count as zero.
    fn update_rate_limit(&self, response: &Response) -> RateLimitInfo {
        let header = |name: &str| -> u64 {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };

        let info = RateLimitInfo {
            limit: header("x-ratelimit-limit"),
            remaining: header("x-ratelimit-remaining"),
            reset: header("x-ratelimit-reset"),
            used: header("x-ratelimit-used"),
        };

        *self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(info);
        info
    }

    /// Check response status and convert errors.
    async fn check_response(
        &self,
        response: Response,
        rate_limit: RateLimitInfo,
        authenticated: bool,
    ) -> Result<Page> {
        match response.status() {
            status if status.is_success() => {
                let next = response
                    .headers()
                    .get(LINK)
                    .and_then(|v| v.to_str().ok())
                    .and_then(next_page_url);
                let body: Value = response.json().await?;
                Ok(Page { body, next })
            }
            StatusCode::UNAUTHORIZED => Err(DashError::Unauthorized),
            StatusCode::FORBIDDEN => Err(DashError::RateLimited {
                reset_at: rate_limit.reset_at(),
                authenticated,
            }),
            status => Err(DashError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("auth_mode", &self.auth_mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn client_with(server: &MockServer, tokens: Arc<MemoryTokenStore>) -> GitHubClient {
        GitHubClient::new(server.uri(), tokens).unwrap()
    }

    #[tokio::test]
    async fn test_sends_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .and(header("authorization", "token ghp_good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_token("ghp_good"));
        let client = client_with(&server, tokens);

        let page = client.get_page(&client.url("/repos/o/r/pulls")).await.unwrap();
        assert_eq!(page.body, json!([]));
        assert!(page.next.is_none());
        assert_eq!(client.auth_mode(), AuthMode::Authenticated);
    }

    #[tokio::test]
    async fn test_unauthorized_retries_once_anonymously() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/issues"))
            .and(header("authorization", "token ghp_bad"))
            .respond_with(ResponseTemplate::new(401))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_token("ghp_bad"));
        let client = client_with(&server, tokens.clone());

        let page = client.get_page(&client.url("/repos/o/r/issues")).await.unwrap();

        assert_eq!(page.body, json!([{ "id": 1 }]));
        assert!(tokens.get().is_none());
        assert_eq!(client.auth_mode(), AuthMode::Anonymous);
    }

    #[tokio::test]
    async fn test_unauthorized_without_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.get_page(&client.url("/user")).await.unwrap_err();

        assert!(matches!(err, DashError::Unauthorized));
    }

    #[tokio::test]
    async fn test_forbidden_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-limit", "60")
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000")
                    .insert_header("x-ratelimit-used", "60"),
            )
            .mount(&server)
            .await;

        let client = client_with(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.get_page(&client.url("/repos/o/r/pulls")).await.unwrap_err();

        match err {
            DashError::RateLimited {
                reset_at,
                authenticated,
            } => {
                assert!(!authenticated);
                assert_eq!(reset_at.unwrap().timestamp(), 1_700_000_000);
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }

        let info = client.rate_limit().unwrap();
        assert_eq!(info.limit, 60);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.used, 60);
    }

    #[tokio::test]
    async fn test_other_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.get_page(&client.url("/repos/o/r/pulls")).await.unwrap_err();

        assert!(matches!(err, DashError::Http { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_missing_rate_limit_headers_are_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_with(&server, Arc::new(MemoryTokenStore::new()));
        assert!(client.rate_limit().is_none());

        client.get_page(&client.url("/x")).await.unwrap();
        assert_eq!(client.rate_limit(), Some(RateLimitInfo::default()));
    }

    #[tokio::test]
    async fn test_validate_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "token ghp_candidate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "login": "octocat", "id": 9 })),
            )
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::new());
        let client = client_with(&server, tokens.clone());

        let user = client.validate_token("ghp_candidate").await.unwrap();
        assert_eq!(user.login, "octocat");
        // Validation alone never stores the token
        assert!(tokens.get().is_none());
    }
}
