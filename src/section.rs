// Dashboard sections.
// Names the data categories and the record lists fetched for each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashError;
use crate::github::{Issue, PullRequest, WorkflowRun};
use crate::registry::Repository;

/// A data category shown in the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    PullRequests,
    Issues,
    Actions,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::PullRequests, Section::Issues, Section::Actions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PullRequests => "pull-requests",
            Section::Issues => "issues",
            Section::Actions => "actions",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::PullRequests => "Pull Requests",
            Section::Issues => "Issues",
            Section::Actions => "GitHub Actions",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull-requests" | "pulls" | "prs" => Ok(Section::PullRequests),
            "issues" => Ok(Section::Issues),
            "actions" | "runs" => Ok(Section::Actions),
            other => Err(DashError::Other(format!("unknown section '{}'", other))),
        }
    }
}

/// Records of one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "kebab-case")]
pub enum SectionRecords {
    PullRequests(Vec<PullRequest>),
    Issues(Vec<Issue>),
    Actions(Vec<WorkflowRun>),
}

impl SectionRecords {
    /// An empty record list for `section`.
    pub fn empty(section: Section) -> Self {
        match section {
            Section::PullRequests => SectionRecords::PullRequests(Vec::new()),
            Section::Issues => SectionRecords::Issues(Vec::new()),
            Section::Actions => SectionRecords::Actions(Vec::new()),
        }
    }

    pub fn section(&self) -> Section {
        match self {
            SectionRecords::PullRequests(_) => Section::PullRequests,
            SectionRecords::Issues(_) => Section::Issues,
            SectionRecords::Actions(_) => Section::Actions,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SectionRecords::PullRequests(items) => items.len(),
            SectionRecords::Issues(items) => items.len(),
            SectionRecords::Actions(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetched records tagged with the repository they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionData {
    pub repository: Repository,
    pub records: SectionRecords,
}

impl SectionData {
    pub fn section(&self) -> Section {
        self.records.section()
    }
}
