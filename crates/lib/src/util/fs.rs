//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` atomically.
///
/// The data goes to a sibling `.tmp` file first and is then renamed over the
/// destination, so readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let temp_path = temp_path_for(path);
  fs::write(&temp_path, contents)?;
  fs::rename(&temp_path, path)
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

/// Wipe and recreate a directory, leaving it empty.
pub fn recreate_dir(path: &Path) -> io::Result<()> {
  remove_dir_if_exists(path)?;
  fs::create_dir_all(path)
}

fn temp_path_for(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}
