use std::path::{Path, PathBuf};

use crate::consts::{
  BUILD_DIR, CACHE_FILENAME, COMPONENTS_FILENAME, DOWNLOAD_DIR, LAST_BUILD_FILENAME, SETTINGS_FILENAME,
  SKELETON_FILENAME,
};

/// Environment variable that overrides the workspace base directory.
pub const HOME_ENV: &str = "HATSKIT_HOME";

/// The base directory holding the manifest, skeleton, persisted state and
/// build outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
  base: PathBuf,
}

impl Workspace {
  pub fn new(base: impl Into<PathBuf>) -> Self {
    Self { base: base.into() }
  }

  /// Resolve the workspace from `HATSKIT_HOME`, falling back to the current
  /// directory.
  pub fn from_env() -> std::io::Result<Self> {
    match std::env::var_os(HOME_ENV) {
      Some(home) if !home.is_empty() => Ok(Self::new(home)),
      _ => std::env::current_dir().map(Self::new),
    }
  }

  pub fn base(&self) -> &Path {
    &self.base
  }

  /// Component manifest (`components.json`)
  pub fn components_file(&self) -> PathBuf {
    self.base.join(COMPONENTS_FILENAME)
  }

  /// Baseline archive extracted into every build
  pub fn skeleton_file(&self) -> PathBuf {
    self.base.join(SKELETON_FILENAME)
  }

  pub fn settings_file(&self) -> PathBuf {
    self.base.join(SETTINGS_FILENAME)
  }

  pub fn cache_file(&self) -> PathBuf {
    self.base.join(CACHE_FILENAME)
  }

  pub fn last_build_file(&self) -> PathBuf {
    self.base.join(LAST_BUILD_FILENAME)
  }

  /// Scratch directory for downloaded assets, owned by a single build run
  pub fn download_dir(&self) -> PathBuf {
    self.base.join(DOWNLOAD_DIR)
  }

  /// Build tree that gets zipped into the artifact, owned by a single build run
  pub fn build_dir(&self) -> PathBuf {
    self.base.join(BUILD_DIR)
  }

  /// Output artifacts and their summaries land in the base directory.
  pub fn output_path(&self, filename: &str) -> PathBuf {
    self.base.join(filename)
  }
}
