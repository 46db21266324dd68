//! The record of the most recent build (`last_build.json`).
//!
//! The record is replaced wholesale after every successful build and read
//! once at the start of the next one, where it feeds the changelog and the
//! identical-build check.

mod changelog;

pub use changelog::{Change, Changelog};

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::UNKNOWN_VERSION;
use crate::selection::Selection;
use crate::util::fs::write_atomic;
use crate::util::hash::ContentHash;

#[derive(Debug, Error)]
pub enum RecordError {
  #[error("failed to read build record: {0}")]
  Read(#[source] io::Error),

  #[error("failed to parse build record: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize build record: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write build record: {0}")]
  Write(#[source] io::Error),
}

/// Name and version of a component as it went into a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedComponent {
  #[serde(default)]
  pub name: String,
  #[serde(default = "unknown_version")]
  pub version: String,
}

fn unknown_version() -> String {
  UNKNOWN_VERSION.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
  #[serde(default)]
  pub content_hash: String,
  /// File name of the artifact, relative to the workspace.
  #[serde(default)]
  pub filename: String,
  #[serde(default)]
  pub timestamp: String,
  #[serde(default)]
  pub components: BTreeMap<String, RecordedComponent>,
}

impl BuildRecord {
  pub fn from_selection(
    selection: &Selection,
    content_hash: &ContentHash,
    filename: impl Into<String>,
    timestamp: impl Into<String>,
  ) -> Self {
    let components = selection
      .iter()
      .map(|c| {
        (
          c.id().to_string(),
          RecordedComponent {
            name: c.name().to_string(),
            version: c.version().to_string(),
          },
        )
      })
      .collect();

    Self {
      content_hash: content_hash.to_string(),
      filename: filename.into(),
      timestamp: timestamp.into(),
      components,
    }
  }

  /// True for the empty record used before the first build.
  pub fn is_empty(&self) -> bool {
    self.content_hash.is_empty() && self.components.is_empty()
  }
}

/// Loads and saves the build record file.
#[derive(Debug, Clone)]
pub struct BuildRecordStore {
  path: PathBuf,
}

impl BuildRecordStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the record. Returns `Ok(None)` when no build has completed yet.
  pub fn load(&self) -> Result<Option<BuildRecord>, RecordError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(RecordError::Read(e)),
    };

    let record = serde_json::from_str(&content).map_err(RecordError::Parse)?;
    debug!(path = %self.path.display(), "loaded build record");
    Ok(Some(record))
  }

  /// Load the record, treating a missing or unreadable file as no previous
  /// build.
  pub fn load_or_default(&self) -> BuildRecord {
    match self.load() {
      Ok(record) => record.unwrap_or_default(),
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "ignoring unreadable build record");
        BuildRecord::default()
      }
    }
  }

  /// Replace the record atomically.
  pub fn save(&self, record: &BuildRecord) -> Result<(), RecordError> {
    let content = serde_json::to_string_pretty(record).map_err(RecordError::Serialize)?;
    write_atomic(&self.path, content.as_bytes()).map_err(RecordError::Write)
  }
}
