//! Containment of step targets within the build root.

use std::path::{Component, Path, PathBuf};

use super::StepError;

/// Normalize a manifest target path into a `/`-separated path relative to the
/// build root.
///
/// Leading separators are stripped and `.` segments dropped. Parent segments
/// and drive or UNC prefixes are rejected.
pub fn normalize_target(target: &str) -> Result<String, StepError> {
  let unified = target.replace('\\', "/");
  let trimmed = unified.trim_matches('/');

  let mut segments = Vec::new();
  for component in Path::new(trimmed).components() {
    match component {
      Component::Normal(segment) => {
        let segment = segment.to_str().ok_or_else(|| StepError::PathEscape(target.to_string()))?;
        if segment.contains(':') {
          return Err(StepError::PathEscape(target.to_string()));
        }
        segments.push(segment);
      }
      Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
        return Err(StepError::PathEscape(target.to_string()));
      }
    }
  }

  Ok(segments.join("/"))
}

/// Resolve a manifest target path to a location inside `build_root`.
pub fn resolve_target(build_root: &Path, target: &str) -> Result<PathBuf, StepError> {
  let relative = normalize_target(target)?;
  if relative.is_empty() {
    return Ok(build_root.to_path_buf());
  }
  Ok(build_root.join(relative))
}

/// Validate a bare file name used as a rename target.
pub fn validate_file_name(name: &str) -> Result<&str, StepError> {
  let mut components = Path::new(name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) if !name.contains(['/', '\\', ':']) => Ok(name),
    _ => Err(StepError::PathEscape(name.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn leading_separators_are_stripped() {
    assert_eq!(normalize_target("/switch/").unwrap(), "switch");
    assert_eq!(normalize_target("\\atmosphere\\contents").unwrap(), "atmosphere/contents");
    assert_eq!(normalize_target("./bootloader/payloads").unwrap(), "bootloader/payloads");
  }

  #[test]
  fn empty_target_is_the_root() {
    assert_eq!(normalize_target("").unwrap(), "");
    assert_eq!(normalize_target("/").unwrap(), "");
    assert_eq!(resolve_target(Path::new("/b"), "/").unwrap(), PathBuf::from("/b"));
  }

  #[test]
  fn parent_segments_are_rejected() {
    assert!(matches!(normalize_target("../outside"), Err(StepError::PathEscape(_))));
    assert!(matches!(normalize_target("switch/../../x"), Err(StepError::PathEscape(_))));
    assert!(matches!(normalize_target("..\\x"), Err(StepError::PathEscape(_))));
  }

  #[test]
  fn drive_prefixes_are_rejected() {
    assert!(matches!(normalize_target("C:/Windows"), Err(StepError::PathEscape(_))));
  }

  #[test]
  fn resolve_joins_under_root() {
    assert_eq!(
      resolve_target(Path::new("/b"), "/switch/app").unwrap(),
      PathBuf::from("/b/switch/app")
    );
  }

  #[test]
  fn file_names_must_be_single_segments() {
    assert_eq!(validate_file_name("payload.bin").unwrap(), "payload.bin");
    assert!(validate_file_name("../payload.bin").is_err());
    assert!(validate_file_name("a/b.bin").is_err());
    assert!(validate_file_name("..").is_err());
    assert!(validate_file_name("").is_err());
  }
}
