// GitHub API response types.
// Defines structs for deserializing pull requests, issues, and workflow runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user account (author of an issue or pull request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// Issue or pull request label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: Option<String>,
}

/// Git reference (branch/commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Open or closed pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    /// `null` for deleted accounts.
    pub user: Option<User>,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub head: Option<GitRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Issue as returned by the issues endpoint.
///
/// GitHub also returns pull requests from that endpoint; those carry a
/// `pull_request` object and are dropped before they reach the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub user: Option<User>,
    pub html_url: String,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// Whether this entry is actually a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// GitHub Actions workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub run_number: u64,
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
    #[serde(default)]
    pub workflow_id: u64,
    pub event: Option<String>,
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    pub actor: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
}

impl WorkflowRun {
    /// Workflow name, empty when GitHub omitted it.
    pub fn workflow_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Workflow run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Workflow run conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Neutral,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

/// Rate limit information from the most recent response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    /// Reset time as unix seconds.
    pub reset: u64,
    pub used: u64,
}

impl RateLimitInfo {
    /// Reset time as an instant, if the header carried one.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset == 0 {
            return None;
        }
        DateTime::from_timestamp(self.reset as i64, 0)
    }

    /// Fewer than 10 requests left in the window.
    pub fn is_low(&self) -> bool {
        self.remaining < 10
    }

    /// Anonymous callers running low should be nudged towards a token.
    pub fn should_suggest_token(&self, authenticated: bool) -> bool {
        !authenticated && self.remaining < 20
    }
}
