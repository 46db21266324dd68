//! Per-run context shared by the resolver and the downloader.
//!
//! A `Session` carries everything that used to be ambient state: the token,
//! the API endpoint, HTTP limits and the cache policy for this invocation.

use std::time::Duration;

use chrono::TimeDelta;
use reqwest::Url;

use crate::consts::{APP_NAME, BUILDER_VERSION, CACHE_TTL_HOURS, DEFAULT_API_BASE};

/// Time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest silence tolerated while waiting for response bytes. This is not a
/// deadline for the whole transfer: a slow download that keeps making
/// progress is never cut off.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// How many times a rate-limited resolution is retried before giving up.
pub const DEFAULT_RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct Session {
  /// Base URL of the release API, without a trailing slash.
  pub api_base: String,
  pub token: Option<String>,
  pub user_agent: String,
  pub connect_timeout: Duration,
  pub idle_timeout: Duration,
  /// How long a cached resolution stays authoritative.
  pub cache_ttl: TimeDelta,
  pub max_rate_limit_retries: u32,
  /// Bypass the cache freshness check and conditional revalidation.
  pub force_refresh: bool,
}

impl Default for Session {
  fn default() -> Self {
    Self {
      api_base: DEFAULT_API_BASE.to_string(),
      token: None,
      user_agent: format!("{APP_NAME}/{BUILDER_VERSION}"),
      connect_timeout: DEFAULT_CONNECT_TIMEOUT,
      idle_timeout: DEFAULT_IDLE_TIMEOUT,
      cache_ttl: TimeDelta::hours(CACHE_TTL_HOURS),
      max_rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
      force_refresh: false,
    }
  }
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
    self.api_base = api_base.into().trim_end_matches('/').to_string();
    self
  }

  pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }

  pub fn with_cache_ttl(mut self, ttl: TimeDelta) -> Self {
    self.cache_ttl = ttl;
    self
  }

  pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
    self.idle_timeout = timeout;
    self
  }

  pub fn with_max_rate_limit_retries(mut self, retries: u32) -> Self {
    self.max_rate_limit_retries = retries;
    self
  }

  /// Build the HTTP client used for API calls and downloads.
  pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
      .user_agent(&self.user_agent)
      .connect_timeout(self.connect_timeout)
      .read_timeout(self.idle_timeout)
      .build()
  }

  /// The domain the token belongs to: the API host without a leading `api.`
  /// label, e.g. `github.com` for `https://api.github.com`.
  pub fn token_domain(&self) -> Option<String> {
    let url = Url::parse(&self.api_base).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("api.").map(str::to_string).unwrap_or(host))
  }

  /// Whether a request to `url` may carry the token.
  ///
  /// Only the token domain itself and its subdomains qualify, so a token is
  /// never leaked to a foreign host that merely mentions the domain.
  pub fn token_applies_to(&self, url: &str) -> bool {
    let Some(domain) = self.token_domain() else {
      return false;
    };
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
      return false;
    };
    host == domain || host.ends_with(&format!(".{domain}"))
  }
}
