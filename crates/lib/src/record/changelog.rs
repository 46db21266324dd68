use std::fmt;

use super::BuildRecord;
use crate::selection::Selection;

/// One difference between the previous build and the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
  Added { id: String, name: String, version: String },
  Updated { id: String, name: String, from: String, to: String },
  Removed { id: String, name: String, version: String },
}

impl Change {
  pub fn id(&self) -> &str {
    match self {
      Change::Added { id, .. } | Change::Updated { id, .. } | Change::Removed { id, .. } => id,
    }
  }
}

impl fmt::Display for Change {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Change::Added { name, version, .. } => write!(f, "{name}: Newly Added ({version})"),
      Change::Updated { name, from, to, .. } => write!(f, "{name}: Updated from {from} to {to}"),
      Change::Removed { name, version, .. } => write!(f, "{name}: Removed (was {version})"),
    }
  }
}

/// Ordered list of changes: additions and updates by id, then removals by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
  changes: Vec<Change>,
}

impl Changelog {
  /// Diff `selection` against the `previous` build.
  pub fn between(previous: &BuildRecord, selection: &Selection) -> Self {
    let mut changes = Vec::new();

    for component in selection.iter() {
      match previous.components.get(component.id()) {
        None => changes.push(Change::Added {
          id: component.id().to_string(),
          name: component.name().to_string(),
          version: component.version().to_string(),
        }),
        Some(recorded) if recorded.version != component.version() => changes.push(Change::Updated {
          id: component.id().to_string(),
          name: component.name().to_string(),
          from: recorded.version.clone(),
          to: component.version().to_string(),
        }),
        Some(_) => {}
      }
    }

    for (id, recorded) in &previous.components {
      if selection.contains(id) {
        continue;
      }
      let name = if recorded.name.is_empty() { id } else { &recorded.name };
      changes.push(Change::Removed {
        id: id.clone(),
        name: name.clone(),
        version: recorded.version.clone(),
      });
    }

    Self { changes }
  }

  pub fn is_empty(&self) -> bool {
    self.changes.is_empty()
  }

  pub fn len(&self) -> usize {
    self.changes.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Change> {
    self.changes.iter()
  }

  /// Rendered lines, one per change.
  pub fn lines(&self) -> Vec<String> {
    self.changes.iter().map(Change::to_string).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::ComponentDescriptor;
  use crate::record::RecordedComponent;
  use crate::resolve::AssetInfo;
  use chrono::Utc;

  fn record(entries: &[(&str, &str)]) -> BuildRecord {
    BuildRecord {
      content_hash: "0000000".to_string(),
      components: entries
        .iter()
        .map(|(id, version)| {
          (
            id.to_string(),
            RecordedComponent {
              name: id.to_string(),
              version: version.to_string(),
            },
          )
        })
        .collect(),
      ..Default::default()
    }
  }

  fn selection(entries: &[(&str, &str)]) -> Selection {
    let mut selection = Selection::new();
    for (id, version) in entries {
      selection.insert(
        ComponentDescriptor {
          id: id.to_string(),
          name: id.to_string(),
          ..Default::default()
        },
        Some(AssetInfo {
          url: String::new(),
          version: version.to_string(),
          resolved_at: Utc::now(),
          etag: String::new(),
        }),
      );
    }
    selection
  }

  #[test]
  fn added_and_updated() {
    let changelog = Changelog::between(&record(&[("A", "1.0")]), &selection(&[("A", "1.1"), ("B", "1.0")]));
    assert_eq!(
      changelog.lines(),
      vec!["A: Updated from 1.0 to 1.1", "B: Newly Added (1.0)"]
    );
  }

  #[test]
  fn removed() {
    let changelog = Changelog::between(&record(&[("A", "1.0"), ("C", "2.0")]), &selection(&[("A", "1.0")]));
    assert_eq!(changelog.lines(), vec!["C: Removed (was 2.0)"]);
  }

  #[test]
  fn unchanged_selection_is_empty() {
    let changelog = Changelog::between(&record(&[("A", "1.0")]), &selection(&[("A", "1.0")]));
    assert!(changelog.is_empty());
  }

  #[test]
  fn first_build_adds_everything() {
    let changelog = Changelog::between(&BuildRecord::default(), &selection(&[("b", "2"), ("a", "1")]));
    let ids: Vec<_> = changelog.iter().map(Change::id).collect();
    assert_eq!(ids, vec!["a", "b"]);
  }

  #[test]
  fn removed_without_name_uses_id() {
    let mut previous = record(&[("gone", "1.0")]);
    previous.components.get_mut("gone").unwrap().name.clear();
    let changelog = Changelog::between(&previous, &Selection::new());
    assert_eq!(changelog.lines(), vec!["gone: Removed (was 1.0)"]);
  }
}
