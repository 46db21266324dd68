//! Persistent cache of release resolutions (`hatskit_cache.json`).
//!
//! # File Format
//!
//! ```json
//! {
//!   "Atmosphere-NX/Atmosphere@latest|atmosphere-*.zip": {
//!     "url": "https://github.com/.../atmosphere-1.9.0.zip",
//!     "version": "1.9.0",
//!     "timestamp": "2026-01-04T10:00:00Z",
//!     "etag": "W/\"abc\""
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::fs::write_atomic;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to read cache: {0}")]
  Read(#[source] io::Error),

  #[error("failed to parse cache: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize cache: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write cache: {0}")]
  Write(#[source] io::Error),

  #[error("failed to remove cache: {0}")]
  Remove(#[source] io::Error),
}

/// A concrete downloadable asset resolved for a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
  pub url: String,
  /// The release tag that produced the asset.
  pub version: String,
  #[serde(rename = "timestamp")]
  pub resolved_at: DateTime<Utc>,
  /// Validator returned by the API, empty when none was sent.
  #[serde(default)]
  pub etag: String,
}

impl AssetInfo {
  /// Whether the entry is still authoritative at `now`.
  pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
    now - self.resolved_at < ttl
  }

  pub fn etag(&self) -> Option<&str> {
    Some(self.etag.as_str()).filter(|e| !e.is_empty())
  }
}

/// Cache key for a release lookup: `{repo}@{tag or "latest"}|{pattern}`.
pub fn cache_key(repo: &str, tag: Option<&str>, asset_pattern: &str) -> String {
  format!("{repo}@{}|{asset_pattern}", tag.unwrap_or("latest"))
}

/// In-memory view of the cache file.
///
/// Loaded once before a resolution pass and saved once after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
  path: PathBuf,
  entries: BTreeMap<String, AssetInfo>,
}

impl CacheStore {
  /// An empty cache that will be saved to `path`.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      entries: BTreeMap::new(),
    }
  }

  /// Load the cache from `path`.
  ///
  /// A missing file yields an empty cache. Individual entries that fail to
  /// parse (e.g. a bad timestamp) are dropped so they get re-resolved.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
    let mut store = Self::new(path);

    let content = match fs::read_to_string(&store.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(store),
      Err(e) => return Err(CacheError::Read(e)),
    };

    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content).map_err(CacheError::Parse)?;
    for (key, value) in raw {
      match serde_json::from_value::<AssetInfo>(value) {
        Ok(info) => {
          store.entries.insert(key, info);
        }
        Err(e) => warn!(key = %key, error = %e, "dropping invalid cache entry"),
      }
    }

    debug!(path = %store.path.display(), entries = store.entries.len(), "loaded cache");
    Ok(store)
  }

  /// Load the cache, starting empty if the file is unreadable.
  pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    Self::load(path.clone()).unwrap_or_else(|e| {
      warn!(path = %path.display(), error = %e, "ignoring unreadable cache");
      Self::new(path)
    })
  }

  /// Write the cache atomically.
  pub fn save(&self) -> Result<(), CacheError> {
    let content = serde_json::to_string_pretty(&self.entries).map_err(CacheError::Serialize)?;
    write_atomic(&self.path, content.as_bytes()).map_err(CacheError::Write)
  }

  /// Delete the cache file at `path`. Returns whether a file was removed.
  pub fn clear(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(CacheError::Remove(e)),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn get(&self, key: &str) -> Option<&AssetInfo> {
    self.entries.get(key)
  }

  pub fn insert(&mut self, key: impl Into<String>, info: AssetInfo) -> Option<AssetInfo> {
    self.entries.insert(key.into(), info)
  }

  pub fn remove(&mut self, key: &str) -> Option<AssetInfo> {
    self.entries.remove(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetInfo)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }
}
