//! Component manifest (`components.json`).
//!
//! The manifest is a JSON object mapping component ids to descriptors. It is
//! edited outside of hatskit; this module only reads it (and writes it back
//! for tooling and tests).

mod types;

pub use types::*;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::util::fs::write_atomic;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// All component descriptors, keyed and ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
  components: BTreeMap<String, ComponentDescriptor>,
}

impl Manifest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a manifest from JSON text.
  ///
  /// Only the top level must be a JSON object. Each descriptor is parsed on
  /// its own: one that does not parse is dropped with a warning, and steps
  /// that do not parse are kept as [`Step::Unrecognized`](crate::steps::Step)
  /// so they fail when applied.
  pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;

    let mut manifest = Self::new();
    for (id, value) in raw {
      match serde_json::from_value::<ComponentDescriptor>(value) {
        Ok(descriptor) => manifest.insert(id, descriptor),
        Err(e) => warn!(component = %id, error = %e, "skipping malformed component"),
      }
    }
    Ok(manifest)
  }

  /// Load the manifest at `path`. A missing file is an empty manifest.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        warn!(path = %path.display(), "manifest not found, no components available");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ManifestError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let manifest = Self::from_json(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), components = manifest.len(), "loaded manifest");
    Ok(manifest)
  }

  /// Load the manifest, treating an unreadable file as empty.
  pub fn load_or_default(path: &Path) -> Self {
    Self::load(path).unwrap_or_else(|e| {
      warn!(error = %e, "ignoring unreadable manifest");
      Self::default()
    })
  }

  /// Write the manifest as pretty JSON with sorted keys.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let content = serde_json::to_string_pretty(&self.components).map_err(ManifestError::Serialize)?;
    write_atomic(path, content.as_bytes()).map_err(|source| ManifestError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Add or replace a descriptor under `id`.
  pub fn insert(&mut self, id: impl Into<String>, mut descriptor: ComponentDescriptor) {
    let id = id.into();
    descriptor.id = id.clone();
    descriptor.migrate_legacy_description();
    self.components.insert(id, descriptor);
  }

  pub fn get(&self, id: &str) -> Option<&ComponentDescriptor> {
    self.components.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.components.contains_key(id)
  }

  /// Descriptors in id order.
  pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
    self.components.values()
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.components.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  /// Distinct categories, sorted.
  pub fn categories(&self) -> Vec<&str> {
    let mut categories: Vec<&str> = self.components.values().map(|c| c.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();
    categories
  }
}

impl FromIterator<(String, ComponentDescriptor)> for Manifest {
  fn from_iter<T: IntoIterator<Item = (String, ComponentDescriptor)>>(iter: T) -> Self {
    let mut manifest = Self::new();
    for (id, descriptor) in iter {
      manifest.insert(id, descriptor);
    }
    manifest
  }
}
