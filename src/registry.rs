// Repository registry.
// Static list of tracked repositories, loaded from configuration at startup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// A tracked GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Stable identifier used for selection and cache keys.
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Workflow names whose runs appear in the actions section.
    #[serde(default)]
    pub workflows: Vec<String>,
    /// Workflow names considered for the CI status badge.
    #[serde(default)]
    pub badge_workflows: Vec<String>,
}

impl Repository {
    /// Human-readable name, falling back to the repository name.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn has_workflows(&self) -> bool {
        !self.workflows.is_empty()
    }

    /// Whether a run named `run_name` belongs to a configured workflow.
    pub fn tracks_workflow(&self, run_name: &str) -> bool {
        let run_name = run_name.to_lowercase();
        self.workflows
            .iter()
            .any(|w| w.to_lowercase() == run_name)
    }
}

/// Validated, immutable set of repositories.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    repositories: Vec<Repository>,
}

impl Registry {
    /// Build a registry, rejecting duplicate ids and blank owner/name.
    pub fn new(repositories: Vec<Repository>) -> Result<Self> {
        let mut seen = HashSet::new();

        for repo in &repositories {
            if repo.id.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "repository {}/{} has an empty id",
                    repo.owner, repo.name
                )));
            }
            if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "repository '{}' needs both owner and name",
                    repo.id
                )));
            }
            if !seen.insert(repo.id.as_str()) {
                return Err(DashError::Config(format!(
                    "duplicate repository id '{}'",
                    repo.id
                )));
            }
        }

        Ok(Self { repositories })
    }

    /// Look up by id.
    pub fn get(&self, id: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.id == id)
    }

    /// Look up by id, or by `owner/name` (case-insensitive).
    pub fn find(&self, key: &str) -> Result<&Repository> {
        self.get(key)
            .or_else(|| {
                self.repositories
                    .iter()
                    .find(|r| r.full_name().eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| DashError::UnknownRepository(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
