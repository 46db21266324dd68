//! Step interpreter.
//!
//! Every component declares an ordered list of [`Step`]s that place the
//! contents of its downloaded asset into the build tree. Steps run strictly in
//! order and are isolated from each other: a failing step is recorded in the
//! [`StepReport`] and the next one still runs.
//!
//! Every path a step writes to or deletes is kept inside the build root.

mod archive;
mod paths;
mod types;

pub use archive::{FoundMember, extract_all, find_member};
pub use paths::{normalize_target, resolve_target};
pub use types::Step;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info, warn};

use archive::compile_pattern;
use paths::validate_file_name;

#[derive(Debug, Error)]
pub enum StepError {
  #[error("path escapes the build root: {0}")]
  PathEscape(String),

  #[error("{0} requires a non-empty target path")]
  EmptyTarget(&'static str),

  #[error("invalid pattern '{pattern}': {message}")]
  InvalidPattern { pattern: String, message: String },

  #[error("cannot apply step: {0}")]
  Unrecognized(String),

  #[error("no archive member matches '{0}'")]
  NoMatch(String),

  #[error("failed to read archive {path}: {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl Step {
  /// Apply this step to `build_root` using the downloaded file at `archive`.
  ///
  /// Returns the paths written or deleted.
  pub fn apply(&self, build_root: &Path, archive: &Path) -> Result<Vec<PathBuf>, StepError> {
    match self {
      Step::ExtractAll => extract_all(archive, build_root),
      Step::ExtractToFolder { target_path } => {
        let dest = resolve_target(build_root, target_path)?;
        extract_all(archive, &dest)
      }
      Step::CopyFile { target_path } => copy_file(build_root, archive, target_path),
      Step::FindAndCopy {
        source_file_pattern,
        target_path,
      } => {
        let dir = resolve_target(build_root, target_path)?;
        let found = find_member(archive, source_file_pattern)?
          .ok_or_else(|| StepError::NoMatch(source_file_pattern.clone()))?;
        let dest = dir.join(&found.base_name);
        write_file(&dest, &found.contents)?;
        Ok(vec![dest])
      }
      Step::FindAndRename {
        source_file_pattern,
        target_path,
        target_filename,
      } => {
        let dir = resolve_target(build_root, target_path)?;
        let file_name = validate_file_name(target_filename)?;
        let found = find_member(archive, source_file_pattern)?
          .ok_or_else(|| StepError::NoMatch(source_file_pattern.clone()))?;
        let dest = dir.join(file_name);
        write_file(&dest, &found.contents)?;
        Ok(vec![dest])
      }
      Step::DeleteMatching { target_path } => delete_matching(build_root, target_path),
      Step::Unrecognized(_) => Err(StepError::Unrecognized(
        self.unrecognized_reason().unwrap_or_default(),
      )),
    }
  }
}

/// A step that ran to completion.
#[derive(Debug)]
pub struct AppliedStep {
  pub index: usize,
  pub action: &'static str,
  pub paths: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct FailedStep {
  pub index: usize,
  pub action: &'static str,
  pub error: StepError,
}

/// Outcome of running one component's steps.
#[derive(Debug, Default)]
pub struct StepReport {
  pub applied: Vec<AppliedStep>,
  pub failed: Vec<FailedStep>,
}

impl StepReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Run `steps` in order against `archive`, continuing past failures.
pub fn run_steps(component: &str, steps: &[Step], archive: &Path, build_root: &Path) -> StepReport {
  let mut report = StepReport::default();

  if steps.is_empty() {
    warn!(component = %component, "component has no processing steps");
    return report;
  }

  for (index, step) in steps.iter().enumerate() {
    let action = step.action();
    match step.apply(build_root, archive) {
      Ok(paths) => {
        debug!(component = %component, step = index, action, paths = paths.len(), "step applied");
        report.applied.push(AppliedStep { index, action, paths });
      }
      Err(error) => {
        warn!(component = %component, step = index, action, error = %error, "step failed");
        report.failed.push(FailedStep { index, action, error });
      }
    }
  }

  info!(
    component = %component,
    applied = report.applied.len(),
    failed = report.failed.len(),
    "processed component"
  );
  report
}

fn copy_file(build_root: &Path, archive: &Path, target_path: &str) -> Result<Vec<PathBuf>, StepError> {
  let mut dest = resolve_target(build_root, target_path)?;
  if dest == build_root {
    return Err(StepError::EmptyTarget("copy_file"));
  }
  // An existing directory target receives the file under its own name.
  if dest.is_dir() {
    if let Some(name) = archive.file_name() {
      dest = dest.join(name);
    }
  }

  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(|source| StepError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::copy(archive, &dest).map_err(|source| StepError::Io {
    path: dest.clone(),
    source,
  })?;
  Ok(vec![dest])
}

fn write_file(dest: &Path, contents: &[u8]) -> Result<(), StepError> {
  let io_err = |source| StepError::Io {
    path: dest.to_path_buf(),
    source,
  };
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(io_err)?;
  }
  fs::write(dest, contents).map_err(io_err)
}

fn delete_matching(build_root: &Path, target_path: &str) -> Result<Vec<PathBuf>, StepError> {
  let relative = normalize_target(target_path)?;
  if relative.is_empty() {
    return Err(StepError::EmptyTarget("delete_file"));
  }
  // Validate the glob syntax against the relative part alone.
  compile_pattern(&relative)?;

  let root = dunce::canonicalize(build_root).map_err(|source| StepError::Io {
    path: build_root.to_path_buf(),
    source,
  })?;
  let root_str = root.to_str().ok_or_else(|| StepError::InvalidPattern {
    pattern: target_path.to_string(),
    message: "build root is not valid UTF-8".to_string(),
  })?;

  let pattern = format!("{}/{}", Pattern::escape(root_str), relative);
  let matches = glob::glob(&pattern).map_err(|e| StepError::InvalidPattern {
    pattern: target_path.to_string(),
    message: e.msg.to_string(),
  })?;

  let mut candidates = Vec::new();
  for entry in matches {
    let path = entry.map_err(|e| StepError::Io {
      path: e.path().to_path_buf(),
      source: e.into_error(),
    })?;
    ensure_within(&root, &path)?;
    candidates.push(path);
  }

  let mut removed = Vec::with_capacity(candidates.len());
  for path in candidates {
    if remove_path(&path)? {
      debug!(path = %path.display(), "deleted");
      removed.push(path);
    }
  }
  Ok(removed)
}

/// The parent of `path` must canonicalize inside `root`, so a symlinked
/// directory cannot redirect a deletion outside the build tree.
fn ensure_within(root: &Path, path: &Path) -> Result<(), StepError> {
  let parent = path.parent().unwrap_or(path);
  let canonical = dunce::canonicalize(parent).map_err(|source| StepError::Io {
    path: parent.to_path_buf(),
    source,
  })?;
  if canonical.starts_with(root) && path != root {
    Ok(())
  } else {
    Err(StepError::PathEscape(path.display().to_string()))
  }
}

/// Remove a file, symlink or directory tree. Returns false when the path is
/// already gone (e.g. removed together with a matched ancestor).
fn remove_path(path: &Path) -> Result<bool, StepError> {
  let io_err = |source| StepError::Io {
    path: path.to_path_buf(),
    source,
  };
  let metadata = match fs::symlink_metadata(path) {
    Ok(metadata) => metadata,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
    Err(e) => return Err(io_err(e)),
  };

  let result = if metadata.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  };
  match result {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(io_err(e)),
  }
}
