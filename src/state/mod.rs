// State management module.
// Handles selection, section loading, filtering, and the published view.

pub mod actions;
pub mod dashboard;
pub mod filters;
pub mod view;

pub use actions::{MAX_RUNS, group_by_workflow, latest_per_workflow, order_runs};
pub use dashboard::{Dashboard, Fetched, Selection};
pub use filters::{Authored, FilterState, MAX_SUGGESTIONS, SortOrder, filter_and_sort};
pub use view::{EmptyState, SectionView, ViewError};
