//! Implementation of the `hatskit build` command.
//!
//! Resolves the manifest, selects components, plans the build against the
//! last build record and runs it:
//! - Explicit `--select` ids, `--all`, or the components marked default
//! - An unchanged selection whose artifact still exists asks before
//!   rebuilding, unless `--force` is given
//! - Component failures are reported but still produce a (partial) bundle

use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Local;

use hatskit_lib::build::{BuildDecision, BuildPlan, Builder, ComponentOutcome};
use hatskit_lib::fetch::Downloader;
use hatskit_lib::manifest::Manifest;
use hatskit_lib::platform::Workspace;
use hatskit_lib::record::BuildRecordStore;
use hatskit_lib::selection::Selection;
use hatskit_lib::session::Session;
use hatskit_lib::settings::Settings;

use super::{resolve_manifest, runtime, session};
use crate::output::{
  format_bytes, format_duration, print_change, print_info, print_stat, print_success, print_warning,
};
use crate::prompts::confirm;

pub struct BuildArgs {
  pub select: Vec<String>,
  pub all: bool,
  pub refresh: bool,
  pub force: bool,
  pub yes: bool,
}

pub fn cmd_build(workspace: &Workspace, args: BuildArgs) -> Result<()> {
  let settings = Settings::load_or_default(&workspace.settings_file());
  let manifest = Manifest::load_or_default(&workspace.components_file());
  if manifest.is_empty() {
    bail!("No components defined in {}", workspace.components_file().display());
  }

  let session = session(&settings, args.refresh);
  runtime()?.block_on(build(workspace, &manifest, session, args))
}

async fn build(workspace: &Workspace, manifest: &Manifest, session: Session, args: BuildArgs) -> Result<()> {
  let resolutions = resolve_manifest(workspace, manifest, session.clone()).await?;

  let selection = if !args.select.is_empty() {
    Selection::from_ids(manifest, &resolutions, &args.select)?
  } else if args.all {
    Selection::all(manifest, &resolutions)
  } else {
    Selection::defaults(manifest, &resolutions)
  };
  if selection.is_empty() {
    bail!("No components selected. Pass --select ID or --all.");
  }

  for component in selection.unresolved() {
    print_warning(&format!("{}: no release asset found, it will be skipped", component.name()));
  }

  let previous = BuildRecordStore::new(workspace.last_build_file()).load_or_default();
  let plan = BuildPlan::new(&selection, &previous, workspace, Local::now().date_naive());

  print_info(&format!("Building {} component(s)", selection.len()));
  print_stat("Content hash", plan.content_hash.as_str());
  print_stat("Output", &plan.filename);
  print_changelog(&plan);

  if let BuildDecision::Identical { artifact } = &plan.decision {
    print_info(&format!(
      "Nothing changed since the last build ({})",
      artifact.display()
    ));
    if !args.force && !confirm("Rebuild anyway?", args.yes)? {
      print_info("Build skipped.");
      return Ok(());
    }
  }

  let downloader = Downloader::new(session).context("Failed to create download client")?;
  let started = Instant::now();
  let output = Builder::new(workspace.clone(), downloader)
    .run(&selection, &plan)
    .await
    .context("Build failed")?;

  println!();
  for (id, outcome) in &output.outcomes {
    match outcome {
      ComponentOutcome::Skipped(reason) => print_warning(&format!("{id}: skipped ({reason})")),
      ComponentOutcome::Processed(report) => {
        for failed in &report.failed {
          print_warning(&format!(
            "{id}: step {} ({}) failed: {}",
            failed.index + 1,
            failed.action,
            failed.error
          ));
        }
      }
    }
  }

  let size = std::fs::metadata(&output.artifact).map(|m| m.len()).unwrap_or(0);
  print_success(&format!("Created {}", output.artifact.display()));
  print_stat("Size", &format_bytes(size));
  print_stat("Summary", &output.summary.display().to_string());
  print_stat("Took", &format_duration(started.elapsed()));
  if output.is_partial() {
    print_warning("Some components were not fully processed; the bundle is partial.");
  }

  Ok(())
}

fn print_changelog(plan: &BuildPlan) {
  if plan.changelog.is_empty() {
    return;
  }
  println!();
  println!("Changes since last build:");
  for change in plan.changelog.iter() {
    print_change(change);
  }
  println!();
}
