//! Packaging of the finished build tree.
//!
//! The artifact is a deflate zip of the whole build directory, named
//! `HATS-{DDMMYYYY}-{hash}.zip`, with a `.txt` summary of the same stem.

mod summary;

pub use summary::Summary;

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::consts::OUTPUT_FILENAME_BASE;
use crate::util::hash::ContentHash;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to walk build tree: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("failed to write archive {path}: {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// `HATS-{DDMMYYYY}-{hash}.zip`
pub fn artifact_filename(date: NaiveDate, content_hash: &ContentHash) -> String {
  format!("{OUTPUT_FILENAME_BASE}-{}-{content_hash}.zip", date.format("%d%m%Y"))
}

/// The summary file name for an artifact: same stem, `.txt` extension.
pub fn summary_filename(artifact_filename: &str) -> String {
  let stem = artifact_filename.strip_suffix(".zip").unwrap_or(artifact_filename);
  format!("{stem}.txt")
}

/// Write `contents` to every path in `destinations`.
pub fn write_summary(contents: &str, destinations: &[PathBuf]) -> Result<(), PackageError> {
  for path in destinations {
    fs::write(path, contents).map_err(|source| PackageError::Io {
      path: path.clone(),
      source,
    })?;
    debug!(path = %path.display(), "wrote summary");
  }
  Ok(())
}

/// Zip every entry under `source_dir` into `dest`, in sorted path order.
///
/// Returns the number of files stored.
pub fn zip_directory(source_dir: &Path, dest: &Path) -> Result<usize, PackageError> {
  let zip_err = |source| PackageError::Zip {
    path: dest.to_path_buf(),
    source,
  };
  let io_err = |path: &Path, source| PackageError::Io {
    path: path.to_path_buf(),
    source,
  };

  let file = File::create(dest).map_err(|e| io_err(dest, e))?;
  let mut writer = zip::ZipWriter::new(BufWriter::new(file));
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  let mut files = 0;
  for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
    let entry = entry?;
    let Ok(relative) = entry.path().strip_prefix(source_dir) else {
      continue;
    };
    let name = archive_name(relative);

    if entry.file_type().is_dir() {
      writer.add_directory(format!("{name}/"), options).map_err(zip_err)?;
      continue;
    }

    writer.start_file(name, options).map_err(zip_err)?;
    let mut input = File::open(entry.path()).map_err(|e| io_err(entry.path(), e))?;
    io::copy(&mut input, &mut writer).map_err(|e| io_err(dest, e))?;
    files += 1;
  }

  writer.finish().map_err(zip_err)?;
  info!(path = %dest.display(), files, "created archive");
  Ok(files)
}

/// Zip entry names always use `/`.
fn archive_name(relative: &Path) -> String {
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
