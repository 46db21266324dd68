use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::steps::Step;

/// Where a component's asset comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
  /// Latest or pinned release of a hosted repository.
  #[default]
  #[serde(rename = "github_release", alias = "release")]
  Release,
  /// A fixed download URL, resolved without any API call.
  #[serde(rename = "direct_url")]
  DirectUrl,
}

impl std::fmt::Display for SourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SourceKind::Release => write!(f, "github_release"),
      SourceKind::DirectUrl => write!(f, "direct_url"),
    }
  }
}

/// A selectable unit of bundle content, as declared in `components.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
  /// The manifest key. Not part of the serialized entry.
  #[serde(skip)]
  pub id: String,

  pub name: String,

  #[serde(default)]
  pub category: String,

  /// Language code to description text.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub descriptions: BTreeMap<String, String>,

  /// Single-language description written by older manifests. Moved into
  /// `descriptions["en"]` on load.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  /// Selected when the caller does not pick components explicitly.
  #[serde(default)]
  pub default: bool,

  #[serde(default, rename = "source_type")]
  pub source: SourceKind,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repo: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,

  /// Glob matched against release asset file names.
  #[serde(default)]
  pub asset_pattern: String,

  #[serde(default, rename = "processing_steps")]
  pub steps: Vec<Step>,
}

impl ComponentDescriptor {
  /// The pinned release tag, if any. Blank tags mean "latest".
  pub fn pinned_tag(&self) -> Option<&str> {
    self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }

  pub fn repo(&self) -> Option<&str> {
    self.repo.as_deref().map(str::trim).filter(|r| !r.is_empty())
  }

  pub fn direct_url(&self) -> Option<&str> {
    self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
  }

  /// Description in `language`, falling back to English.
  pub fn description(&self, language: &str) -> &str {
    self
      .descriptions
      .get(language)
      .or_else(|| self.descriptions.get("en"))
      .map(String::as_str)
      .or(self.description.as_deref())
      .unwrap_or("")
  }

  /// Move a legacy `description` into `descriptions["en"]`.
  ///
  /// Returns true when the descriptor was changed. A descriptor that already
  /// has localized descriptions keeps them and the legacy field is dropped.
  pub fn migrate_legacy_description(&mut self) -> bool {
    let Some(legacy) = self.description.take() else {
      return false;
    };
    if self.descriptions.is_empty() {
      self.descriptions.insert("en".to_string(), legacy);
    }
    true
  }
}
