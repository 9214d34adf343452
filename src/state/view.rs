// Section view model.
// What the presentation layer renders: records, error, loading flag, empty state.

use crate::error::{DashError, ErrorKind};
use crate::section::{Section, SectionRecords};

/// Why a section shows no records. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoRepositorySelected,
    NoMatchingRecords,
    NoWorkflowsConfigured,
}

impl EmptyState {
    pub fn message(&self, section: Section) -> String {
        match self {
            EmptyState::NoRepositorySelected => format!(
                "Select a repository to view {}.",
                section.title().to_lowercase()
            ),
            EmptyState::NoMatchingRecords => format!(
                "No {} found for this repository and filter.",
                section.title().to_lowercase()
            ),
            EmptyState::NoWorkflowsConfigured => {
                "No workflows are configured for this repository.".to_string()
            }
        }
    }
}

/// Error summary carried by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DashError> for ViewError {
    fn from(err: &DashError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// State of one section for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub section: Section,
    pub repository_id: Option<String>,
    pub records: SectionRecords,
    pub error: Option<ViewError>,
    pub is_loading: bool,
    pub empty_state: Option<EmptyState>,
}

impl SectionView {
    /// Nothing requested yet.
    pub fn idle(section: Section) -> Self {
        Self {
            section,
            repository_id: None,
            records: SectionRecords::empty(section),
            error: None,
            is_loading: false,
            empty_state: Some(EmptyState::NoRepositorySelected),
        }
    }

    pub fn loading(section: Section, repository_id: &str) -> Self {
        Self {
            repository_id: Some(repository_id.to_string()),
            is_loading: true,
            empty_state: None,
            ..Self::idle(section)
        }
    }

    /// Loaded records; empty lists get an explanatory empty state.
    pub fn loaded(
        repository_id: &str,
        records: SectionRecords,
        empty_reason: EmptyState,
        error: Option<ViewError>,
    ) -> Self {
        let empty_state = records.is_empty().then_some(empty_reason);
        Self {
            section: records.section(),
            repository_id: Some(repository_id.to_string()),
            records,
            error,
            is_loading: false,
            empty_state,
        }
    }

    /// Failed load: no records, error attached.
    pub fn failed(section: Section, repository_id: &str, err: &DashError) -> Self {
        Self {
            repository_id: Some(repository_id.to_string()),
            error: Some(err.into()),
            empty_state: None,
            ..Self::idle(section)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_empty_gets_reason() {
        let view = SectionView::loaded(
            "sdk",
            SectionRecords::empty(Section::Actions),
            EmptyState::NoWorkflowsConfigured,
            None,
        );
        assert_eq!(view.empty_state, Some(EmptyState::NoWorkflowsConfigured));
        assert!(!view.is_loading);
        assert!(view.error.is_none());
    }

    #[test]
    fn test_failed_view_carries_error_kind() {
        let err = DashError::RateLimited {
            reset_at: None,
            authenticated: false,
        };
        let view = SectionView::failed(Section::Issues, "sdk", &err);

        assert!(view.records.is_empty());
        assert_eq!(view.error.unwrap().kind, ErrorKind::RateLimit);
    }

    #[test]
    fn test_empty_state_messages_differ() {
        let section = Section::PullRequests;
        let messages = [
            EmptyState::NoRepositorySelected.message(section),
            EmptyState::NoMatchingRecords.message(section),
            EmptyState::NoWorkflowsConfigured.message(section),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert!(messages[0].contains("pull requests"));
    }
}
