// Error types for repodash.
// Covers GitHub API failures, rate limiting, token handling, and configuration.

use chrono::{DateTime, Local, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Network error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Invalid GitHub token. Please check your configuration.")]
    Unauthorized,

    #[error("{}", rate_limit_message(.authenticated, .reset_at))]
    RateLimited {
        reset_at: Option<DateTime<Utc>>,
        authenticated: bool,
    },

    #[error("GitHub API error: {status} ({url})")]
    Http { status: u16, url: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown repository: {0}")]
    UnknownRepository(String),

    #[error("Token broker error: {0}")]
    TokenBroker(String),

    #[error("Request superseded by a newer selection")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid token; the client has already downgraded to anonymous mode.
    Auth,
    /// Rate limit exhausted; carries a reset time in the message.
    RateLimit,
    /// Transport failures, unexpected HTTP statuses, undecodable payloads.
    Network,
    Config,
    Cancelled,
}

impl DashError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashError::Unauthorized => ErrorKind::Auth,
            DashError::RateLimited { .. } => ErrorKind::RateLimit,
            DashError::Config(_) | DashError::UnknownRepository(_) => ErrorKind::Config,
            DashError::Cancelled => ErrorKind::Cancelled,
            DashError::Api(_)
            | DashError::Http { .. }
            | DashError::Json(_)
            | DashError::Io(_)
            | DashError::TokenBroker(_)
            | DashError::Other(_) => ErrorKind::Network,
        }
    }
}

fn rate_limit_message(authenticated: &bool, reset_at: &Option<DateTime<Utc>>) -> String {
    let reset = reset_at
        .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if *authenticated {
        format!("API rate limit exceeded. Resets at {}.", reset)
    } else {
        format!(
            "Rate limit exceeded (60 requests/hour for unauthenticated requests). \
             Resets at {}. Consider adding a GitHub token for 5000 requests/hour.",
            reset
        )
    }
}

pub type Result<T> = std::result::Result<T, DashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_distinguishes_auth_mode() {
        let authenticated = DashError::RateLimited {
            reset_at: None,
            authenticated: true,
        };
        let anonymous = DashError::RateLimited {
            reset_at: None,
            authenticated: false,
        };

        assert_eq!(
            authenticated.to_string(),
            "API rate limit exceeded. Resets at unknown."
        );
        assert!(anonymous.to_string().contains("60 requests/hour"));
        assert!(anonymous.to_string().contains("adding a GitHub token"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(DashError::Unauthorized.kind(), ErrorKind::Auth);
        assert_eq!(
            DashError::Http {
                status: 500,
                url: "https://api.github.com/x".to_string()
            }
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(DashError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            DashError::UnknownRepository("nope".to_string()).kind(),
            ErrorKind::Config
        );
    }
}
