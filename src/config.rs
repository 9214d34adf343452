// Configuration loading.
// Reads the TOML config file and applies environment overrides.
//
// Priority (highest first): CLI flags, REPODASH_* environment variables,
// config file, defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{TtlPolicy, paths};
use crate::error::{DashError, Result};
use crate::github::GITHUB_API_BASE;
use crate::registry::{Registry, Repository};

/// Cache TTLs in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub authenticated_ttl_secs: u64,
    pub anonymous_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = TtlPolicy::default();
        Self {
            authenticated_ttl_secs: policy.authenticated.as_secs(),
            anonymous_ttl_secs: policy.anonymous.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            authenticated: Duration::from_secs(self.authenticated_ttl_secs),
            anonymous: Duration::from_secs(self.anonymous_ttl_secs),
        }
    }
}

/// Where tokens come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Environment variable holding a token.
    pub env_var: String,
    /// Optional broker endpoint returning `{token, source}`.
    pub broker_url: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            env_var: "GITHUB_TOKEN".to_string(),
            broker_url: None,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    /// GitHub login of the dashboard owner, informational.
    pub username: Option<String>,
    pub cache: CacheConfig,
    pub token: TokenConfig,
    pub repositories: Vec<Repository>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: GITHUB_API_BASE.to_string(),
            username: None,
            cache: CacheConfig::default(),
            token: TokenConfig::default(),
            repositories: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match paths::config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DashError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| DashError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - REPODASH_API_BASE: GitHub API base URL
    /// - REPODASH_TOKEN_BROKER_URL: token broker endpoint
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(api_base) = std::env::var("REPODASH_API_BASE") {
            self.api_base = api_base;
        }

        if let Ok(url) = std::env::var("REPODASH_TOKEN_BROKER_URL") {
            self.token.broker_url = Some(url);
        }

        self
    }

    /// Validated repository registry.
    pub fn registry(&self) -> Result<Registry> {
        Registry::new(self.repositories.clone())
    }
}
