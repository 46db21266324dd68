//! The set of components chosen for a build.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::consts::UNKNOWN_VERSION;
use crate::manifest::{ComponentDescriptor, Manifest};
use crate::resolve::{AssetInfo, Resolutions};
use crate::util::hash::{ContentHash, content_hash};

#[derive(Debug, Error)]
pub enum SelectionError {
  #[error("unknown component: {0}")]
  UnknownComponent(String),
}

/// A selected component paired with its resolution, if one was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedComponent {
  pub descriptor: ComponentDescriptor,
  pub asset: Option<AssetInfo>,
}

impl SelectedComponent {
  pub fn id(&self) -> &str {
    &self.descriptor.id
  }

  pub fn name(&self) -> &str {
    &self.descriptor.name
  }

  /// The resolved version, or `N/A` when resolution failed.
  pub fn version(&self) -> &str {
    self.asset.as_ref().map(|a| a.version.as_str()).unwrap_or(UNKNOWN_VERSION)
  }
}

/// Selected components keyed and ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  components: BTreeMap<String, SelectedComponent>,
}

impl Selection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, descriptor: ComponentDescriptor, asset: Option<AssetInfo>) {
    self
      .components
      .insert(descriptor.id.clone(), SelectedComponent { descriptor, asset });
  }

  /// Select the given ids. Unknown ids are an error.
  pub fn from_ids<I, S>(manifest: &Manifest, resolutions: &Resolutions, ids: I) -> Result<Self, SelectionError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut selection = Self::new();
    for id in ids {
      let id = id.as_ref();
      let descriptor = manifest
        .get(id)
        .ok_or_else(|| SelectionError::UnknownComponent(id.to_string()))?;
      selection.insert(descriptor.clone(), resolutions.get(id).cloned().flatten());
    }
    Ok(selection)
  }

  /// Select every component flagged `default`.
  pub fn defaults(manifest: &Manifest, resolutions: &Resolutions) -> Self {
    Self::matching(manifest, resolutions, |d| d.default)
  }

  /// Select every component of the manifest.
  pub fn all(manifest: &Manifest, resolutions: &Resolutions) -> Self {
    Self::matching(manifest, resolutions, |_| true)
  }

  fn matching(manifest: &Manifest, resolutions: &Resolutions, keep: impl Fn(&ComponentDescriptor) -> bool) -> Self {
    let mut selection = Self::new();
    for descriptor in manifest.iter().filter(|d| keep(d)) {
      selection.insert(descriptor.clone(), resolutions.get(&descriptor.id).cloned().flatten());
    }
    selection
  }

  pub fn get(&self, id: &str) -> Option<&SelectedComponent> {
    self.components.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.components.contains_key(id)
  }

  /// Components in id order.
  pub fn iter(&self) -> impl Iterator<Item = &SelectedComponent> {
    self.components.values()
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  /// Components without a resolved asset.
  pub fn unresolved(&self) -> impl Iterator<Item = &SelectedComponent> {
    self.iter().filter(|c| c.asset.is_none())
  }

  /// Identity of the bundle this selection produces.
  pub fn content_hash(&self) -> ContentHash {
    content_hash(self.iter().map(|c| (c.id(), c.version())))
  }

  /// Distinct categories of the selected components, sorted.
  pub fn categories(&self) -> Vec<&str> {
    let mut categories: Vec<&str> = self.iter().map(|c| c.descriptor.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();
    categories
  }
}
