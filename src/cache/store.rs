// Cache store for section responses.
// Handles TTL checking, whole-map invalidation, and JSON snapshots on disk.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;
use crate::github::AuthMode;
use crate::section::{Section, SectionData};

/// TTL while requests are authenticated: 5 minutes.
pub const AUTHENTICATED_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for the public API, longer to conserve the 60 requests/hour budget.
pub const ANONYMOUS_TTL: Duration = Duration::from_secs(30 * 60);

/// TTL per authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub authenticated: Duration,
    pub anonymous: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            authenticated: AUTHENTICATED_TTL,
            anonymous: ANONYMOUS_TTL,
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, mode: AuthMode) -> Duration {
        match mode {
            AuthMode::Authenticated => self.authenticated,
            AuthMode::Anonymous => self.anonymous,
        }
    }
}

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    /// The cached data.
    pub data: T,
    /// When the data was cached.
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    /// Create a new cached data entry stamped now.
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Time since the entry was written; future timestamps count as fresh.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// An entry is valid only while its age is strictly below `ttl`.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        !self.is_valid(ttl)
    }
}

/// Section responses keyed by section name and repository id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResponseCache {
    entries: HashMap<String, CachedData<SectionData>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key: `"<section>-<repository id>"`.
    pub fn key(section: Section, repository_id: &str) -> String {
        format!("{}-{}", section.as_str(), repository_id)
    }

    /// Cached data for the pair, if younger than `ttl`.
    pub fn get(&self, section: Section, repository_id: &str, ttl: Duration) -> Option<&SectionData> {
        let key = Self::key(section, repository_id);
        match self.entries.get(&key) {
            Some(cached) if cached.is_valid(ttl) => {
                debug!(key = %key, age_secs = cached.age().as_secs(), "Cache hit");
                Some(&cached.data)
            }
            Some(_) => {
                debug!(key = %key, "Cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Replace the entry for the data's section and repository.
    pub fn insert(&mut self, data: SectionData) {
        let key = Self::key(data.section(), &data.repository.id);
        self.entries.insert(key, CachedData::new(data));
    }

    /// Drop every entry regardless of age.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a snapshot, starting empty when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match read_json::<ResponseCache>(path) {
            Ok(Some(cache)) => cache,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable cache snapshot");
                Self::default()
            }
        }
    }

    /// Write a snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Read JSON data from a file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&contents)?;
    Ok(Some(data))
}

/// Write data as JSON.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(data)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Delete a snapshot file.
pub fn delete(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
