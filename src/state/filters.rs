// Filter and sort state for issues and pull requests.
// Author substring filtering plus stable ordering by creation date.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DashError;
use crate::github::{Issue, PullRequest};

/// Maximum number of author suggestions offered at once.
pub const MAX_SUGGESTIONS: usize = 8;

/// Sort direction by creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Newest => f.write_str("newest"),
            SortOrder::Oldest => f.write_str("oldest"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            other => Err(DashError::Other(format!(
                "unknown sort order '{}', expected newest or oldest",
                other
            ))),
        }
    }
}

/// Records with an author and a creation time.
///
/// A record without an author reports an empty login.
pub trait Authored {
    fn author_login(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Authored for Issue {
    fn author_login(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.login.as_str())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Authored for PullRequest {
    fn author_login(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.login.as_str())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Filter state of one section; reset when the selected repository changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub sort_by: SortOrder,
    pub user_filter: String,
    /// Author logins seen in the most recent load.
    pub available_users: BTreeSet<String>,
}

impl FilterState {
    /// Any filter differs from the defaults.
    pub fn is_active(&self) -> bool {
        self.sort_by != SortOrder::Newest || !self.user_filter.trim().is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Author logins containing `query`, case-insensitively.
    ///
    /// Returns nothing when the only match is the query itself.
    pub fn suggestions(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        let matches: Vec<String> = self
            .available_users
            .iter()
            .filter(|user| query.is_empty() || user.to_lowercase().contains(&query))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();

        if !query.is_empty() && matches.len() == 1 && matches[0].to_lowercase() == query {
            return Vec::new();
        }
        matches
    }

    /// Apply this state to `items`.
    pub fn apply<T: Authored + Clone>(&self, items: &[T]) -> Vec<T> {
        filter_and_sort(items, &self.user_filter, self.sort_by)
    }
}

/// Filter by author substring (case-insensitive), then stable-sort by creation date.
pub fn filter_and_sort<T: Authored + Clone>(
    items: &[T],
    user_filter: &str,
    sort_by: SortOrder,
) -> Vec<T> {
    let query = user_filter.trim().to_lowercase();

    let mut filtered: Vec<T> = items
        .iter()
        .filter(|item| query.is_empty() || item.author_login().to_lowercase().contains(&query))
        .cloned()
        .collect();

    match sort_by {
        SortOrder::Newest => filtered.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
        SortOrder::Oldest => filtered.sort_by_key(|item| item.created_at()),
    }

    filtered
}

/// Distinct author logins of `items`.
pub fn extract_users<T: Authored>(items: &[T]) -> BTreeSet<String> {
    items
        .iter()
        .map(|item| item.author_login())
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .collect()
}
