//! Build identity hashing.
//!
//! A bundle is identified by the set of `(component id, version)` pairs it
//! was built from. The pairs are sorted by id before hashing, so the same
//! selection always yields the same identity regardless of the order it was
//! assembled in.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::CONTENT_HASH_LEN;

/// A short hexadecimal digest identifying the contents of a bundle.
///
/// # Format
///
/// Lowercase hexadecimal, truncated to 7 characters, e.g. `"3f9a1c2"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Compute the content hash of a set of `(id, version)` pairs.
///
/// Pairs are fed to SHA-256 in ascending id order, each field prefixed by its
/// byte length (`"{len}:{id}{len}:{version}"`), so no two distinct selections
/// produce the same input.
pub fn content_hash<'a, I>(pairs: I) -> ContentHash
where
  I: IntoIterator<Item = (&'a str, &'a str)>,
{
  let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
  pairs.sort_unstable();

  let mut hasher = Sha256::new();
  for (id, version) in pairs {
    hasher.update(format!("{}:{id}{}:{version}", id.len(), version.len()).as_bytes());
  }

  let full = hex::encode(hasher.finalize());
  ContentHash(full[..CONTENT_HASH_LEN].to_string())
}
