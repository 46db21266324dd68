//! Implementation of the `hatskit clear-cache` command.

use anyhow::{Context, Result};

use hatskit_lib::platform::Workspace;
use hatskit_lib::resolve::CacheStore;

use crate::output::{print_info, print_success};

pub fn cmd_clear_cache(workspace: &Workspace) -> Result<()> {
  let path = workspace.cache_file();
  let removed = CacheStore::clear(&path).context("Failed to clear cache")?;

  if removed {
    print_success(&format!("Cache cleared ({})", path.display()));
  } else {
    print_info("No cache to clear.");
  }
  Ok(())
}
