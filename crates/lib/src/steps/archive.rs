//! Zip archive helpers shared by the extraction and search steps.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use glob::Pattern;
use zip::ZipArchive;

use super::StepError;

type Archive = ZipArchive<BufReader<File>>;

pub(crate) fn open(archive_path: &Path) -> Result<Archive, StepError> {
  let file = File::open(archive_path).map_err(|source| StepError::Io {
    path: archive_path.to_path_buf(),
    source,
  })?;
  ZipArchive::new(BufReader::new(file)).map_err(|source| StepError::Archive {
    path: archive_path.to_path_buf(),
    source,
  })
}

/// Extract every entry of `archive_path` into `dest`, overwriting existing
/// files. Returns the paths written.
///
/// All entry names are validated before anything is written, so an archive
/// with an escaping member leaves `dest` untouched.
pub fn extract_all(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, StepError> {
  let mut archive = open(archive_path)?;
  let archive_err = |source| StepError::Archive {
    path: archive_path.to_path_buf(),
    source,
  };

  let mut entries = Vec::with_capacity(archive.len());
  for i in 0..archive.len() {
    let entry = archive.by_index(i).map_err(archive_err)?;
    let relative = entry
      .enclosed_name()
      .ok_or_else(|| StepError::PathEscape(entry.name().to_string()))?;
    entries.push((i, relative, entry.is_dir()));
  }

  create_dir(dest)?;
  let mut written = Vec::with_capacity(entries.len());
  for (i, relative, is_dir) in entries {
    let dest_path = dest.join(&relative);

    if is_dir {
      create_dir(&dest_path)?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      create_dir(parent)?;
    }

    let mut entry = archive.by_index(i).map_err(archive_err)?;
    let io_err = |source| StepError::Io {
      path: dest_path.clone(),
      source,
    };
    let mut outfile = File::create(&dest_path).map_err(io_err)?;
    io::copy(&mut entry, &mut outfile).map_err(io_err)?;

    // Keep the executable bit on Unix
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if entry.unix_mode().is_some_and(|mode| mode & 0o111 != 0) {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(0o755)).map_err(io_err)?;
      }
    }

    written.push(dest_path);
  }

  Ok(written)
}

/// A file member found by base-name search.
#[derive(Debug)]
pub struct FoundMember {
  pub base_name: String,
  pub contents: Vec<u8>,
}

/// Scan archive members in stored order, skipping directories, and return the
/// first whose base name matches `pattern`.
pub fn find_member(archive_path: &Path, pattern: &str) -> Result<Option<FoundMember>, StepError> {
  let matcher = compile_pattern(pattern)?;
  let mut archive = open(archive_path)?;
  let archive_err = |source| StepError::Archive {
    path: archive_path.to_path_buf(),
    source,
  };

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(archive_err)?;
    if entry.is_dir() {
      continue;
    }

    let base_name = match entry.name().rsplit(|c| c == '/' || c == '\\').next() {
      Some(base) if !base.is_empty() && base != "." && base != ".." => base.to_string(),
      _ => continue,
    };
    if !matcher.matches(&base_name) {
      continue;
    }

    // The declared size comes from the archive header and is not trusted.
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).map_err(|source| StepError::Io {
      path: archive_path.join(entry.name()),
      source,
    })?;
    return Ok(Some(FoundMember { base_name, contents }));
  }

  Ok(None)
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, StepError> {
  Pattern::new(pattern).map_err(|e| StepError::InvalidPattern {
    pattern: pattern.to_string(),
    message: e.msg.to_string(),
  })
}

fn create_dir(path: &Path) -> Result<(), StepError> {
  fs::create_dir_all(path).map_err(|source| StepError::Io {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{write_zip, write_zip64_with_declared_size};
  use tempfile::TempDir;

  #[test]
  fn extract_all_writes_nested_entries() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("a.zip");
    write_zip(&zip, &[("foo.txt", b"foo"), ("dir/", b""), ("dir/bar.txt", b"bar")]);
    let dest = temp.path().join("out");

    let written = extract_all(&zip, &dest).unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(fs::read_to_string(dest.join("foo.txt")).unwrap(), "foo");
    assert_eq!(fs::read_to_string(dest.join("dir/bar.txt")).unwrap(), "bar");
  }

  #[test]
  fn extract_all_overwrites_existing_files() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("a.zip");
    write_zip(&zip, &[("foo.txt", b"new")]);
    let dest = temp.path().join("out");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("foo.txt"), "old").unwrap();

    extract_all(&zip, &dest).unwrap();

    assert_eq!(fs::read_to_string(dest.join("foo.txt")).unwrap(), "new");
  }

  #[test]
  fn extract_all_rejects_escaping_members_before_writing() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("evil.zip");
    write_zip(&zip, &[("ok.txt", b"ok"), ("../escape.txt", b"bad")]);
    let dest = temp.path().join("out");

    let result = extract_all(&zip, &dest);

    assert!(matches!(result, Err(StepError::PathEscape(_))));
    assert!(!dest.join("ok.txt").exists());
    assert!(!temp.path().join("escape.txt").exists());
  }

  #[test]
  fn corrupt_archive_is_an_archive_error() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("bad.zip");
    fs::write(&zip, b"definitely not a zip").unwrap();

    assert!(matches!(
      extract_all(&zip, &temp.path().join("out")),
      Err(StepError::Archive { .. })
    ));
  }

  #[test]
  fn find_member_returns_first_match_in_stored_order() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("a.zip");
    write_zip(
      &zip,
      &[
        ("readme.md", b"docs"),
        ("switch/zeta.nro", b"first"),
        ("switch/alpha.nro", b"second"),
      ],
    );

    let found = find_member(&zip, "*.nro").unwrap().unwrap();

    assert_eq!(found.base_name, "zeta.nro");
    assert_eq!(found.contents, b"first");
  }

  #[test]
  fn find_member_matches_base_name_only() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("a.zip");
    write_zip(&zip, &[("payloads/", b""), ("payloads/hekate.bin", b"x")]);

    assert!(find_member(&zip, "payloads*").unwrap().is_none());
    assert!(find_member(&zip, "hekate*.bin").unwrap().is_some());
  }

  #[test]
  fn invalid_pattern_is_reported() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("a.zip");
    write_zip(&zip, &[("a.txt", b"a")]);

    assert!(matches!(
      find_member(&zip, "[unclosed"),
      Err(StepError::InvalidPattern { .. })
    ));
  }

  #[test]
  fn find_member_ignores_declared_size() {
    let temp = TempDir::new().unwrap();
    let zip = temp.path().join("huge.zip");
    write_zip64_with_declared_size(&zip, "switch/app.nro", b"payload", u64::MAX / 2);

    // Either the member is read from its actual data or the archive is
    // rejected; a lying header never turns into an allocation of that size.
    match find_member(&zip, "*.nro") {
      Ok(Some(found)) => assert_eq!(found.contents, b"payload"),
      Ok(None) => panic!("member should have been found"),
      Err(e) => assert!(matches!(e, StepError::Archive { .. } | StepError::Io { .. })),
    }
  }
}
