//! Implementation of the `hatskit components` command.
//!
//! Resolves every component of the manifest and lists them by category with
//! their resolved version and description.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use hatskit_lib::manifest::Manifest;
use hatskit_lib::platform::Workspace;
use hatskit_lib::settings::Settings;

use super::{resolve_manifest, runtime, session};
use crate::output::{OutputFormat, print_json, print_warning, symbols};

pub fn cmd_components(workspace: &Workspace, refresh: bool, output: OutputFormat) -> Result<()> {
  let settings = Settings::load_or_default(&workspace.settings_file());
  let manifest = Manifest::load_or_default(&workspace.components_file());

  if manifest.is_empty() {
    print_warning(&format!(
      "No components defined in {}",
      workspace.components_file().display()
    ));
    return Ok(());
  }

  let rt = runtime()?;
  let resolutions = rt.block_on(resolve_manifest(workspace, &manifest, session(&settings, refresh)))?;
  let version_of = |id: &str| {
    resolutions
      .get(id)
      .and_then(|r| r.as_ref())
      .map(|info| info.version.clone())
  };

  if output.is_json() {
    let items: Vec<_> = manifest
      .iter()
      .map(|c| {
        serde_json::json!({
          "id": c.id,
          "name": c.name,
          "category": c.category,
          "default": c.default,
          "source": c.source.to_string(),
          "version": version_of(&c.id),
          "description": c.description(&settings.language),
        })
      })
      .collect();
    return print_json(&items);
  }

  for category in manifest.categories() {
    println!();
    println!(
      "{}",
      format!("--- {} ---", category.to_uppercase()).if_supports_color(Stream::Stdout, |s| s.bold())
    );
    for component in manifest.iter().filter(|c| c.category == category) {
      let marker = if component.default { symbols::SUCCESS } else { " " };
      let version = match version_of(&component.id) {
        Some(version) => version,
        None => "not found".to_string(),
      };
      println!(
        " {} {} {} {}",
        marker.if_supports_color(Stream::Stdout, |s| s.green()),
        component.name,
        format!("({version})").if_supports_color(Stream::Stdout, |s| s.dimmed()),
        format!("[{}]", component.id).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      );
      let description = component.description(&settings.language);
      if !description.is_empty() {
        println!("     {description}");
      }
    }
  }

  Ok(())
}
