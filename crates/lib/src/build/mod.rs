//! Build planning and execution.
//!
//! A build runs in a fixed order:
//!
//! 1. Wipe and recreate the build and download directories
//! 2. Extract the skeleton archive into the build directory
//! 3. For each selected component (in id order): download its asset and run
//!    its steps
//! 4. Write the summary, zip the build tree and save the build record
//! 5. Remove the build and download directories
//!
//! A missing or unreadable skeleton aborts the build before any download.
//! Component failures never abort it; they are reported per component and
//! the result is a partial build.

mod plan;

pub use plan::{BuildDecision, BuildPlan};

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::BUILDER_VERSION;
use crate::fetch::{Downloader, download_filename};
use crate::package::{self, PackageError, Summary, summary_filename};
use crate::platform::Workspace;
use crate::record::{BuildRecord, BuildRecordStore, RecordError};
use crate::selection::Selection;
use crate::steps::{StepError, StepReport, extract_all, run_steps};
use crate::util::fs::{recreate_dir, remove_dir_if_exists};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("skeleton archive not found at {0}")]
  SkeletonMissing(PathBuf),

  #[error("failed to extract skeleton {path}: {source}")]
  Skeleton {
    path: PathBuf,
    #[source]
    source: StepError,
  },

  #[error("failed to prepare {path}: {source}")]
  Prepare {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Record(#[from] RecordError),
}

/// Why a selected component contributed nothing to the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  Unresolved,
  DownloadFailed,
}

impl std::fmt::Display for SkipReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SkipReason::Unresolved => write!(f, "no release asset found"),
      SkipReason::DownloadFailed => write!(f, "download failed"),
    }
  }
}

#[derive(Debug)]
pub enum ComponentOutcome {
  Skipped(SkipReason),
  Processed(StepReport),
}

impl ComponentOutcome {
  pub fn is_complete(&self) -> bool {
    matches!(self, ComponentOutcome::Processed(report) if report.is_success())
  }
}

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildOutput {
  pub artifact: PathBuf,
  pub summary: PathBuf,
  pub record: BuildRecord,
  pub outcomes: BTreeMap<String, ComponentOutcome>,
}

impl BuildOutput {
  /// True when any component was skipped or had a failing step.
  pub fn is_partial(&self) -> bool {
    self.outcomes.values().any(|o| !o.is_complete())
  }
}

pub struct Builder {
  workspace: Workspace,
  downloader: Downloader,
}

impl Builder {
  pub fn new(workspace: Workspace, downloader: Downloader) -> Self {
    Self { workspace, downloader }
  }

  /// Run the build described by `plan` for `selection`.
  pub async fn run(&self, selection: &Selection, plan: &BuildPlan) -> Result<BuildOutput, BuildError> {
    let build_dir = self.workspace.build_dir();
    let download_dir = self.workspace.download_dir();

    for dir in [&build_dir, &download_dir] {
      recreate_dir(dir).map_err(|source| BuildError::Prepare {
        path: dir.clone(),
        source,
      })?;
    }

    let result = self.assemble(selection, plan, &build_dir, &download_dir).await;
    self.cleanup();
    let output = result?;
    info!(artifact = %output.artifact.display(), hash = %plan.content_hash, "build complete");
    Ok(output)
  }

  /// Seed the skeleton, process every component and package the build
  /// directory. The caller removes the per-run directories afterwards.
  async fn assemble(
    &self,
    selection: &Selection,
    plan: &BuildPlan,
    build_dir: &Path,
    download_dir: &Path,
  ) -> Result<BuildOutput, BuildError> {
    self.seed_skeleton(build_dir)?;

    let total = selection.len();
    let mut outcomes = BTreeMap::new();
    for (index, component) in selection.iter().enumerate() {
      let id = component.id();
      info!(component = %id, index = index + 1, total, "processing component");

      let Some(asset) = &component.asset else {
        warn!(component = %id, "no release asset found, skipping");
        outcomes.insert(id.to_string(), ComponentOutcome::Skipped(SkipReason::Unresolved));
        continue;
      };

      let archive = download_dir.join(download_filename(id, &asset.url));
      if !self.downloader.download(&asset.url, &archive).await {
        warn!(component = %id, "download failed, skipping");
        outcomes.insert(id.to_string(), ComponentOutcome::Skipped(SkipReason::DownloadFailed));
        continue;
      }

      let report = run_steps(id, &component.descriptor.steps, &archive, build_dir);
      outcomes.insert(id.to_string(), ComponentOutcome::Processed(report));
    }

    let now = Utc::now();
    let summary = Summary {
      selection,
      content_hash: &plan.content_hash,
      changelog: &plan.changelog,
      builder_version: BUILDER_VERSION,
      generated_at: now,
    }
    .render();
    let summary_name = summary_filename(&plan.filename);
    let summary_path = self.workspace.output_path(&summary_name);
    package::write_summary(&summary, &[build_dir.join(&summary_name), summary_path.clone()])?;

    let artifact = self.workspace.output_path(&plan.filename);
    package::zip_directory(build_dir, &artifact)?;

    let record = BuildRecord::from_selection(selection, &plan.content_hash, &plan.filename, now.to_rfc3339());
    BuildRecordStore::new(self.workspace.last_build_file()).save(&record)?;

    Ok(BuildOutput {
      artifact,
      summary: summary_path,
      record,
      outcomes,
    })
  }

  fn seed_skeleton(&self, build_dir: &Path) -> Result<(), BuildError> {
    let skeleton = self.workspace.skeleton_file();
    if !skeleton.is_file() {
      return Err(BuildError::SkeletonMissing(skeleton));
    }
    let entries = extract_all(&skeleton, build_dir).map_err(|source| BuildError::Skeleton {
      path: skeleton.clone(),
      source,
    })?;
    info!(path = %skeleton.display(), files = entries.len(), "extracted skeleton");
    Ok(())
  }

  /// Remove the per-run directories. Failures only warn.
  fn cleanup(&self) {
    for dir in [self.workspace.build_dir(), self.workspace.download_dir()] {
      if let Err(e) = remove_dir_if_exists(&dir) {
        warn!(path = %dir.display(), error = %e, "failed to clean up");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::{ComponentDescriptor, Manifest, SourceKind};
  use crate::resolve::{CacheStore, Resolver};
  use crate::session::Session;
  use crate::steps::Step;
  use crate::util::testutil::{write_zip, zip_names};
  use chrono::NaiveDate;
  use std::fs;
  use tempfile::TempDir;

  fn direct(id: &str, url: String, steps: Vec<Step>) -> ComponentDescriptor {
    ComponentDescriptor {
      id: id.to_string(),
      name: id.to_uppercase(),
      category: "Homebrew".to_string(),
      source: SourceKind::DirectUrl,
      url: Some(url),
      steps,
      ..Default::default()
    }
  }

  fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("asset.zip");
    write_zip(&path, entries);
    fs::read(path).unwrap()
  }

  fn builder(ws: &Workspace) -> Builder {
    Builder::new(ws.clone(), Downloader::new(Session::new()).unwrap())
  }

  async fn selection_for(manifest: &Manifest, ws: &Workspace) -> Selection {
    let resolver = Resolver::new(Session::new()).unwrap();
    let mut cache = CacheStore::new(ws.cache_file());
    let resolutions = resolver.resolve_all(manifest, &mut cache).await;
    Selection::all(manifest, &resolutions)
  }

  fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()
  }

  #[tokio::test]
  async fn full_build_produces_artifact_summary_and_record() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/tool.zip")
      .with_status(200)
      .with_body(zip_bytes(&[("tool/app.nro", b"nro"), ("tool/readme.md", b"docs")]))
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_zip(&ws.skeleton_file(), &[("bootloader/hekate_ipl.ini", b"[config]")]);

    let mut manifest = Manifest::new();
    manifest.insert(
      "tool",
      direct(
        "tool",
        format!("{}/tool.zip", server.url()),
        vec![
          Step::FindAndCopy {
            source_file_pattern: "*.nro".to_string(),
            target_path: "/switch/tool/".to_string(),
          },
          Step::FindAndCopy {
            source_file_pattern: "*.ovl".to_string(),
            target_path: "/switch/".to_string(),
          },
        ],
      ),
    );
    let selection = selection_for(&manifest, &ws).await;
    let plan = BuildPlan::new(&selection, &BuildRecord::default(), &ws, date());

    let output = builder(&ws).run(&selection, &plan).await.unwrap();

    assert_eq!(output.artifact, ws.output_path(&plan.filename));
    assert!(output.artifact.is_file());
    assert!(output.summary.is_file());
    assert!(output.is_partial(), "the missing .ovl step should be reported");

    let names = zip_names(&output.artifact);
    assert!(names.contains(&"bootloader/hekate_ipl.ini".to_string()));
    assert!(names.contains(&"switch/tool/app.nro".to_string()));
    assert!(names.contains(&summary_filename(&plan.filename)));

    let summary = fs::read_to_string(&output.summary).unwrap();
    assert!(summary.contains("* TOOL: Newly Added (direct)"));
    assert!(summary.contains(" - TOOL (direct)"));

    let record = BuildRecordStore::new(ws.last_build_file()).load().unwrap().unwrap();
    assert_eq!(record, output.record);
    assert_eq!(record.content_hash, plan.content_hash.to_string());
    assert_eq!(record.filename, plan.filename);

    assert!(!ws.build_dir().exists());
    assert!(!ws.download_dir().exists());

    let again = BuildPlan::new(&selection, &record, &ws, date());
    assert!(again.is_identical());
  }

  #[tokio::test]
  async fn missing_skeleton_aborts_before_downloading() {
    let mut server = mockito::Server::new_async().await;
    let download = server.mock("GET", "/tool.zip").expect(0).create_async().await;

    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let mut manifest = Manifest::new();
    manifest.insert(
      "tool",
      direct("tool", format!("{}/tool.zip", server.url()), vec![Step::ExtractAll]),
    );
    let selection = selection_for(&manifest, &ws).await;
    let plan = BuildPlan::new(&selection, &BuildRecord::default(), &ws, date());

    let result = builder(&ws).run(&selection, &plan).await;

    assert!(matches!(result, Err(BuildError::SkeletonMissing(_))));
    assert!(!ws.output_path(&plan.filename).exists());
    assert!(!ws.build_dir().exists());
    assert!(!ws.download_dir().exists());
    assert!(!ws.last_build_file().exists());
    download.assert_async().await;
  }

  #[tokio::test]
  async fn corrupt_skeleton_aborts() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    fs::write(ws.skeleton_file(), "not a zip").unwrap();
    let selection = Selection::new();
    let plan = BuildPlan::new(&selection, &BuildRecord::default(), &ws, date());

    let result = builder(&ws).run(&selection, &plan).await;

    assert!(matches!(result, Err(BuildError::Skeleton { .. })));
    assert!(!ws.build_dir().exists());
  }

  #[tokio::test]
  async fn unresolved_and_failed_downloads_are_skipped() {
    let mut server = mockito::Server::new_async().await;
    let _gone = server.mock("GET", "/gone.zip").with_status(404).create_async().await;

    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_zip(&ws.skeleton_file(), &[("base.txt", b"base")]);

    let mut selection = Selection::new();
    selection.insert(
      direct("gone", format!("{}/gone.zip", server.url()), vec![Step::ExtractAll]),
      Some(crate::resolve::AssetInfo {
        url: format!("{}/gone.zip", server.url()),
        version: "1.0".to_string(),
        resolved_at: Utc::now(),
        etag: String::new(),
      }),
    );
    selection.insert(
      ComponentDescriptor {
        id: "missing".to_string(),
        name: "Missing".to_string(),
        ..Default::default()
      },
      None,
    );
    let plan = BuildPlan::new(&selection, &BuildRecord::default(), &ws, date());

    let output = builder(&ws).run(&selection, &plan).await.unwrap();

    assert!(matches!(
      output.outcomes["gone"],
      ComponentOutcome::Skipped(SkipReason::DownloadFailed)
    ));
    assert!(matches!(
      output.outcomes["missing"],
      ComponentOutcome::Skipped(SkipReason::Unresolved)
    ));
    assert!(zip_names(&output.artifact).contains(&"base.txt".to_string()));
    assert_eq!(output.record.components["missing"].version, "N/A");
  }
}
