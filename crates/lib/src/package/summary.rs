use chrono::{DateTime, Utc};

use crate::record::Changelog;
use crate::selection::Selection;
use crate::util::hash::ContentHash;

const RULE: &str = "===================================";

/// Human-readable description of a bundle, shipped inside it and next to it.
#[derive(Debug)]
pub struct Summary<'a> {
  pub selection: &'a Selection,
  pub content_hash: &'a ContentHash,
  pub changelog: &'a Changelog,
  pub builder_version: &'a str,
  pub generated_at: DateTime<Utc>,
}

impl Summary<'_> {
  pub fn render(&self) -> String {
    let mut lines = vec![
      RULE.to_string(),
      format!("HATS Pack Summary (Builder v{})", self.builder_version),
      RULE.to_string(),
      String::new(),
      format!("Generated on: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
      format!("Builder Version: {}", self.builder_version),
      format!("Content Hash: {}", self.content_hash),
      String::new(),
    ];

    if !self.changelog.is_empty() {
      lines.push("--- CHANGELOG (What's New Since Last Build) ---".to_string());
      lines.extend(self.changelog.iter().map(|change| format!("* {change}")));
      lines.push(String::new());
      lines.push("-------------------------------------------------".to_string());
      lines.push(String::new());
    }

    lines.push("--- INCLUDED COMPONENTS ---".to_string());
    for category in self.selection.categories() {
      lines.push(String::new());
      lines.push(format!("--- {} ---", category.to_uppercase()));
      for component in self.selection.iter().filter(|c| c.descriptor.category == category) {
        lines.push(format!(" - {} ({})", component.name(), component.version()));
      }
    }
    lines.push(String::new());

    lines.join("\n")
  }
}
