// GitHub API module.
// Provides the client, pagination, and types for the GitHub REST API.

pub mod client;
pub mod endpoints;
pub mod pagination;
pub mod types;

pub use client::{AuthMode, GITHUB_API_BASE, GitHubClient, Page};
pub use pagination::{MAX_PAGES, PER_PAGE, Paged};
pub use types::*;
