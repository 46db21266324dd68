//! Status command implementation.
//!
//! Displays the record of the last build.

use anyhow::{Context, Result};

use hatskit_lib::platform::Workspace;
use hatskit_lib::record::BuildRecordStore;

use crate::output::{OutputFormat, format_bytes, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_status(workspace: &Workspace, verbose: bool, output: OutputFormat) -> Result<()> {
  let store = BuildRecordStore::new(workspace.last_build_file());

  let record = match store.load() {
    Ok(Some(record)) => record,
    Ok(None) => {
      if output.is_json() {
        return print_json(&serde_json::Value::Null);
      }
      print_info("No build recorded yet. Run 'hatskit build' to create one.");
      return Ok(());
    }
    Err(e) => return Err(e).context("Failed to load the last build record"),
  };

  if output.is_json() {
    return print_json(&record);
  }

  print_success(&format!("Last build: {}", record.filename));
  print_stat("Content hash", &record.content_hash);
  print_stat("Built at", &record.timestamp);
  print_stat("Components", &record.components.len().to_string());

  let artifact = workspace.output_path(&record.filename);
  match std::fs::metadata(&artifact) {
    Ok(meta) => print_stat("Artifact size", &format_bytes(meta.len())),
    Err(_) => print_warning(&format!("Artifact {} no longer exists", artifact.display())),
  }

  if verbose {
    println!();
    println!("Components:");
    for (id, component) in &record.components {
      println!("  {} ({}) [{}]", component.name, component.version, id);
    }
  }

  Ok(())
}
