//! Build identity and the identical-build decision.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::package::artifact_filename;
use crate::platform::Workspace;
use crate::record::{BuildRecord, Changelog};
use crate::selection::Selection;
use crate::util::hash::ContentHash;

/// Whether the planned build differs from the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
  /// Same contents as the previous build, whose artifact still exists.
  Identical { artifact: PathBuf },
  Novel,
}

/// Everything known about a build before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
  pub content_hash: ContentHash,
  /// Artifact file name, relative to the workspace.
  pub filename: String,
  pub changelog: Changelog,
  pub decision: BuildDecision,
}

impl BuildPlan {
  /// Plan a build of `selection` against the `previous` record.
  ///
  /// The plan only reports `Identical`; whether to skip is the caller's call.
  pub fn new(selection: &Selection, previous: &BuildRecord, workspace: &Workspace, date: NaiveDate) -> Self {
    let content_hash = selection.content_hash();
    let changelog = Changelog::between(previous, selection);
    let filename = artifact_filename(date, &content_hash);

    let previous_artifact = workspace.output_path(&previous.filename);
    let decision = if changelog.is_empty()
      && !previous.filename.is_empty()
      && previous.content_hash == content_hash.as_str()
      && previous_artifact.is_file()
    {
      BuildDecision::Identical {
        artifact: previous_artifact,
      }
    } else {
      BuildDecision::Novel
    };

    Self {
      content_hash,
      filename,
      changelog,
      decision,
    }
  }

  pub fn is_identical(&self) -> bool {
    matches!(self.decision, BuildDecision::Identical { .. })
  }
}
