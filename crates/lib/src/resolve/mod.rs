//! Release resolution.
//!
//! Maps a [`ComponentDescriptor`] to a concrete [`AssetInfo`]: the download
//! URL of the first release asset whose file name matches the descriptor's
//! pattern, together with the release tag it came from.
//!
//! Resolutions are cached for the session TTL. Expired entries are
//! revalidated with a conditional request, and rate-limited requests are
//! retried after the reset window within a bounded budget.

mod api;
mod cache;
mod ratelimit;

pub use api::{ApiError, ApiResponse, HttpReleaseApi, Release, ReleaseApi, ReleaseAsset, release_url};
pub use cache::{AssetInfo, CacheError, CacheStore, cache_key};
pub use ratelimit::{RateLimitGuard, rate_limit_wait};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{DIRECT_VERSION, UNKNOWN_VERSION};
use crate::manifest::{ComponentDescriptor, Manifest, SourceKind};
use crate::session::Session;

/// Resolution outcome per component id. `None` means not found.
pub type Resolutions = BTreeMap<String, Option<AssetInfo>>;

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("component has no repository")]
  MissingRepo,

  #[error("component has no download URL")]
  MissingUrl,

  #[error("invalid asset pattern '{pattern}': {message}")]
  InvalidPattern { pattern: String, message: String },

  #[error(transparent)]
  Api(#[from] ApiError),

  #[error("release API returned HTTP {status} for {url}")]
  Status { status: u16, url: String },

  #[error("rate limit retries exhausted for {0}")]
  RateLimitExhausted(String),

  #[error("release not modified but nothing cached for {0}")]
  NotModifiedWithoutCache(String),

  #[error("failed to parse release response: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("no releases published for {0}")]
  NoReleases(String),

  #[error("no asset of release {version} matches '{pattern}'")]
  NoMatchingAsset { version: String, pattern: String },
}

pub struct Resolver<A = HttpReleaseApi> {
  api: A,
  session: Session,
}

impl Resolver<HttpReleaseApi> {
  /// A resolver talking to the release API configured in `session`.
  pub fn new(session: Session) -> Result<Self, ApiError> {
    let api = HttpReleaseApi::new(&session)?;
    Ok(Self { api, session })
  }
}

impl<A: ReleaseApi> Resolver<A> {
  pub fn with_api(api: A, session: Session) -> Self {
    Self { api, session }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// Resolve one component, consulting and updating `cache`.
  pub async fn resolve(&self, descriptor: &ComponentDescriptor, cache: &mut CacheStore) -> Result<AssetInfo, ResolveError> {
    match descriptor.source {
      SourceKind::DirectUrl => resolve_direct(descriptor, Utc::now()),
      SourceKind::Release => self.resolve_release(descriptor, cache).await,
    }
  }

  async fn resolve_release(
    &self,
    descriptor: &ComponentDescriptor,
    cache: &mut CacheStore,
  ) -> Result<AssetInfo, ResolveError> {
    let repo = descriptor.repo().ok_or(ResolveError::MissingRepo)?;
    let tag = descriptor.pinned_tag();
    let pattern = &descriptor.asset_pattern;
    let matcher = Pattern::new(pattern).map_err(|e| ResolveError::InvalidPattern {
      pattern: pattern.clone(),
      message: e.msg.to_string(),
    })?;

    let key = cache_key(repo, tag, pattern);
    let now = Utc::now();
    let cached = cache.get(&key).cloned();

    if !self.session.force_refresh {
      if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(now, self.session.cache_ttl)) {
        debug!(key = %key, version = %entry.version, "cache hit");
        return Ok(entry.clone());
      }
    }

    let etag = if self.session.force_refresh {
      None
    } else {
      cached.as_ref().and_then(|e| e.etag()).map(str::to_string)
    };

    let url = release_url(&self.session.api_base, repo, tag);
    let mut guard = RateLimitGuard::new(self.session.max_rate_limit_retries);

    loop {
      match self.api.get(&url, etag.as_deref()).await? {
        ApiResponse::NotModified => {
          debug!(key = %key, "release not modified");
          return cached.ok_or(ResolveError::NotModifiedWithoutCache(key));
        }
        ApiResponse::RateLimited { wait } => {
          if guard.wait(wait, repo).await {
            continue;
          }
          return Err(ResolveError::RateLimitExhausted(repo.to_string()));
        }
        ApiResponse::Failed { status } => return Err(ResolveError::Status { status, url }),
        ApiResponse::Ok { body, etag } => {
          let release = parse_release(&body, tag.is_some(), repo)?;
          let info = match_asset(&release, &matcher, pattern, etag, now)?;
          debug!(key = %key, version = %info.version, url = %info.url, "resolved release asset");
          cache.insert(key, info.clone());
          return Ok(info);
        }
      }
    }
  }

  /// Resolve every component of `manifest` in id order.
  ///
  /// Failures are logged and recorded as `None`; they never stop the pass.
  pub async fn resolve_all(&self, manifest: &Manifest, cache: &mut CacheStore) -> Resolutions {
    let mut resolutions = Resolutions::new();

    for descriptor in manifest.iter() {
      let outcome = match self.resolve(descriptor, cache).await {
        Ok(info) => {
          info!(component = %descriptor.id, version = %info.version, "resolved");
          Some(info)
        }
        Err(e) => {
          warn!(component = %descriptor.id, error = %e, "could not resolve component, skipping");
          None
        }
      };
      resolutions.insert(descriptor.id.clone(), outcome);
    }

    resolutions
  }
}

/// Direct URL components resolve locally to their pinned URL.
fn resolve_direct(descriptor: &ComponentDescriptor, now: DateTime<Utc>) -> Result<AssetInfo, ResolveError> {
  let url = descriptor.direct_url().ok_or(ResolveError::MissingUrl)?;
  Ok(AssetInfo {
    url: url.to_string(),
    version: descriptor.pinned_tag().unwrap_or(DIRECT_VERSION).to_string(),
    resolved_at: now,
    etag: String::new(),
  })
}

/// Parse a tag response (a release object) or a list response (an array
/// whose first element is the latest release).
fn parse_release(body: &str, pinned: bool, repo: &str) -> Result<Release, ResolveError> {
  if pinned {
    return serde_json::from_str(body).map_err(ResolveError::Parse);
  }
  let releases: Vec<Release> = serde_json::from_str(body).map_err(ResolveError::Parse)?;
  releases
    .into_iter()
    .next()
    .ok_or_else(|| ResolveError::NoReleases(repo.to_string()))
}

/// Pick the first asset, in API order, whose name matches.
fn match_asset(
  release: &Release,
  matcher: &Pattern,
  pattern: &str,
  etag: Option<String>,
  now: DateTime<Utc>,
) -> Result<AssetInfo, ResolveError> {
  let version = release.tag_name.as_deref().unwrap_or(UNKNOWN_VERSION);
  let asset = release
    .assets
    .iter()
    .find(|asset| matcher.matches(&asset.name))
    .ok_or_else(|| ResolveError::NoMatchingAsset {
      version: version.to_string(),
      pattern: pattern.to_string(),
    })?;

  Ok(AssetInfo {
    url: asset.browser_download_url.clone(),
    version: version.to_string(),
    resolved_at: now,
    etag: etag.unwrap_or_default(),
  })
}
