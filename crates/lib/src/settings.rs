//! User settings persisted in `config.json`.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::fs::write_atomic;

/// Environment variable that takes precedence over the stored token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read settings {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse settings {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize settings: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write settings {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
  /// Language code used to pick component descriptions.
  #[serde(default = "default_language")]
  pub language: String,

  /// Personal access token for the release API.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub github_pat: Option<String>,
}

fn default_language() -> String {
  DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      language: default_language(),
      github_pat: None,
    }
  }
}

impl Settings {
  /// Load settings from `path`. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load settings, falling back to the defaults when the file is unreadable.
  pub fn load_or_default(path: &Path) -> Self {
    Self::load(path).unwrap_or_else(|e| {
      warn!(error = %e, "ignoring unreadable settings");
      Self::default()
    })
  }

  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
    write_atomic(path, content.as_bytes()).map_err(|source| ConfigError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  /// The token to authenticate with: `GITHUB_TOKEN` if set, otherwise the
  /// stored one. Blank values count as unset.
  pub fn token(&self) -> Option<String> {
    std::env::var(TOKEN_ENV)
      .ok()
      .filter(|t| !t.trim().is_empty())
      .or_else(|| self.github_pat.clone().filter(|t| !t.trim().is_empty()))
  }
}
