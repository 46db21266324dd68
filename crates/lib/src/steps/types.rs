use serde::{Deserialize, Serialize};

/// A declarative file-placement operation run against a downloaded asset.
///
/// Serialized as an object tagged by `action`, using the names manifests have
/// always used (`unzip_to_root`, `delete_file`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Step {
  /// Unzip the whole archive into the build root.
  #[serde(rename = "unzip_to_root", alias = "extract_all")]
  ExtractAll,

  /// Copy the downloaded file as-is to `target_path`.
  #[serde(rename = "copy_file")]
  CopyFile { target_path: String },

  /// Unzip the whole archive into the `target_path` folder.
  #[serde(rename = "unzip_folder", alias = "extract_to_folder")]
  ExtractToFolder {
    #[serde(default)]
    target_path: String,
  },

  /// Copy the first archive member whose base name matches the pattern into
  /// the `target_path` folder, keeping its name.
  #[serde(rename = "find_and_copy")]
  FindAndCopy {
    source_file_pattern: String,
    #[serde(default)]
    target_path: String,
  },

  /// Like `FindAndCopy`, but the member is written as `target_filename`.
  #[serde(rename = "find_and_rename")]
  FindAndRename {
    source_file_pattern: String,
    #[serde(default)]
    target_path: String,
    target_filename: String,
  },

  /// Recursively delete everything under the build root matching the glob.
  #[serde(rename = "delete_file", alias = "delete_matching")]
  DeleteMatching {
    #[serde(alias = "path")]
    target_path: String,
  },

  /// A step object that matches none of the forms above: an unknown action or
  /// a known one with missing or mistyped fields. Kept verbatim so the rest of
  /// the manifest still loads; applying it fails.
  #[serde(untagged)]
  Unrecognized(serde_json::Value),
}

/// Every action name a manifest may use, aliases included.
const ACTIONS: &[&str] = &[
  "unzip_to_root",
  "extract_all",
  "copy_file",
  "unzip_folder",
  "extract_to_folder",
  "find_and_copy",
  "find_and_rename",
  "delete_file",
  "delete_matching",
];

impl Step {
  /// The serialized action name, for logs and reports.
  pub fn action(&self) -> &'static str {
    match self {
      Step::ExtractAll => "unzip_to_root",
      Step::CopyFile { .. } => "copy_file",
      Step::ExtractToFolder { .. } => "unzip_folder",
      Step::FindAndCopy { .. } => "find_and_copy",
      Step::FindAndRename { .. } => "find_and_rename",
      Step::DeleteMatching { .. } => "delete_file",
      Step::Unrecognized(_) => "unrecognized",
    }
  }

  /// Why an [`Step::Unrecognized`] step could not be understood.
  pub fn unrecognized_reason(&self) -> Option<String> {
    let Step::Unrecognized(raw) = self else {
      return None;
    };
    let reason = match raw.get("action").and_then(serde_json::Value::as_str) {
      None => "step has no action".to_string(),
      Some(action) if ACTIONS.contains(&action) => {
        format!("'{action}' step has missing or invalid fields")
      }
      Some(action) => format!("unknown action '{action}'"),
    };
    Some(reason)
  }
}
