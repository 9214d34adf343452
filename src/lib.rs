// repodash library.
// Fetches, caches, and filters GitHub pull requests, issues, and workflow runs.

pub mod badges;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod registry;
pub mod section;
pub mod state;
pub mod token;

pub use config::Config;
pub use error::{DashError, ErrorKind, Result};
pub use registry::{Registry, Repository};
pub use section::{Section, SectionData, SectionRecords};
pub use state::Dashboard;
