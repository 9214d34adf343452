// Status badge URLs.
// Builds shields.io image URLs for open issues, open pull requests, and CI status.

use serde::Serialize;

use crate::registry::Repository;

const SHIELDS_BASE: &str = "https://img.shields.io/github";

/// Badge image URLs for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badges {
    pub repository_id: String,
    pub issues: String,
    pub pull_requests: String,
    /// `None` when the repository has no badge workflows.
    pub ci: Option<String>,
}

impl Badges {
    pub fn for_repository(repository: &Repository) -> Self {
        let (owner, name) = (&repository.owner, &repository.name);

        Self {
            repository_id: repository.id.clone(),
            issues: format!("{}/issues/{}/{}?style=flat", SHIELDS_BASE, owner, name),
            pull_requests: format!(
                "{}/issues-pr/{}/{}?style=flat&label=PRs",
                SHIELDS_BASE, owner, name
            ),
            ci: ci_workflow(repository).map(|workflow| {
                format!(
                    "{}/actions/workflow/status/{}/{}/{}?style=flat&label=CI",
                    SHIELDS_BASE,
                    owner,
                    name,
                    workflow_file(workflow)
                )
            }),
        }
    }
}

/// The workflow whose status the CI badge shows.
///
/// Prefers a badge workflow named "daily ci", then one containing "daily" or
/// "ci", then the first tracked workflow.
pub fn ci_workflow(repository: &Repository) -> Option<&str> {
    if repository.badge_workflows.is_empty() {
        return None;
    }

    repository
        .badge_workflows
        .iter()
        .find(|w| {
            let w = w.to_lowercase();
            w == "daily ci" || w.contains("daily") || w.contains("ci")
        })
        .or_else(|| repository.workflows.first())
        .or_else(|| repository.badge_workflows.first())
        .map(String::as_str)
}

/// Workflow file name: lower-cased, whitespace runs replaced by `-`, plus `.yml`.
pub fn workflow_file(workflow: &str) -> String {
    let slug = workflow
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("{}.yml", slug)
}
