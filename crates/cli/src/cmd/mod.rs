mod build;
mod clear_cache;
mod components;
mod status;

pub use build::{BuildArgs, cmd_build};
pub use clear_cache::cmd_clear_cache;
pub use components::cmd_components;
pub use status::cmd_status;

use anyhow::{Context, Result};
use tracing::warn;

use hatskit_lib::manifest::Manifest;
use hatskit_lib::platform::Workspace;
use hatskit_lib::resolve::{CacheStore, Resolutions, Resolver};
use hatskit_lib::session::Session;
use hatskit_lib::settings::Settings;

/// Overrides the release API endpoint, e.g. for a mirror.
const API_BASE_ENV: &str = "HATSKIT_API_BASE";

/// Build the session for this invocation from the stored settings.
fn session(settings: &Settings, refresh: bool) -> Session {
  let session = Session::new()
    .with_token(settings.token())
    .with_force_refresh(refresh);
  match std::env::var(API_BASE_ENV) {
    Ok(base) if !base.trim().is_empty() => session.with_api_base(base),
    _ => session,
  }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}

/// Resolve every manifest component, loading the cache before the pass and
/// saving it after.
async fn resolve_manifest(workspace: &Workspace, manifest: &Manifest, session: Session) -> Result<Resolutions> {
  let resolver = Resolver::new(session).context("Failed to create release API client")?;
  let mut cache = CacheStore::load_or_default(workspace.cache_file());

  let resolutions = resolver.resolve_all(manifest, &mut cache).await;

  if let Err(e) = cache.save() {
    warn!(error = %e, "failed to save resolution cache");
  }
  Ok(resolutions)
}
