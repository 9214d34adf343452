// Filesystem locations.
// Resolves the cache snapshot, config file, and token file under the platform dirs.

use std::path::PathBuf;

use directories::ProjectDirs;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "repodash")
}

/// Get the base cache directory (~/.cache/repodash on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the response cache snapshot.
pub fn responses_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("responses.json"))
}

/// Get the base config directory (~/.config/repodash on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the default configuration file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the persisted token file.
pub fn token_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("token"))
}
