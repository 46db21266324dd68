//! Test utilities for hatskit-lib.
//!
//! Helpers for building zip fixtures and component descriptors in tests.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Write a zip archive at `path` containing the given `(name, contents)`
/// entries. Names ending in `/` are added as directories.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
  let file = File::create(path).unwrap();
  let mut writer = zip::ZipWriter::new(file);
  let options = SimpleFileOptions::default();

  for (name, contents) in entries {
    if name.ends_with('/') {
      writer.add_directory(*name, options).unwrap();
    } else {
      writer.start_file(*name, options).unwrap();
      writer.write_all(contents).unwrap();
    }
  }

  writer.finish().unwrap();
}

/// Write a stored, zip64 single-entry archive, then patch its central
/// directory so the entry claims an uncompressed size of `declared` bytes.
pub fn write_zip64_with_declared_size(path: &Path, name: &str, contents: &[u8], declared: u64) {
  let file = File::create(path).unwrap();
  let mut writer = zip::ZipWriter::new(file);
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Stored)
    .large_file(true);
  writer.start_file(name, options).unwrap();
  writer.write_all(contents).unwrap();
  writer.finish().unwrap();

  let mut bytes = std::fs::read(path).unwrap();
  let central = bytes
    .windows(4)
    .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
    .expect("central directory header");
  let u16_at = |b: &[u8], at: usize| u16::from_le_bytes([b[at], b[at + 1]]) as usize;

  // A 32-bit size of 0xFFFFFFFF defers to the zip64 extra field.
  bytes[central + 24..central + 28].copy_from_slice(&u32::MAX.to_le_bytes());

  let name_len = u16_at(&bytes, central + 28);
  let extra_len = u16_at(&bytes, central + 30);
  let mut at = central + 46 + name_len;
  let end = at + extra_len;
  while at + 4 <= end {
    let (id, len) = (u16_at(&bytes, at), u16_at(&bytes, at + 2));
    if id == 0x0001 {
      bytes[at + 4..at + 12].copy_from_slice(&declared.to_le_bytes());
      std::fs::write(path, bytes).unwrap();
      return;
    }
    at += 4 + len;
  }
  panic!("archive has no zip64 extra field");
}

/// Read the entry names of a zip archive, in archive order.
pub fn zip_names(path: &Path) -> Vec<String> {
  let file = File::open(path).unwrap();
  let archive = zip::ZipArchive::new(file).unwrap();
  archive.file_names().map(str::to_string).collect()
}
