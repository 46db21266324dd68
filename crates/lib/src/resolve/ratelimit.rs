//! Rate-limit detection and bounded backoff for the release API.

use std::time::Duration;

use tracing::warn;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// How long to wait before retrying a rate-limited request, or `None` if the
/// response is not a rate-limit rejection.
///
/// A response is rate limited when the status is 403 or 429 and the remaining
/// quota header reads `0`. The wait is the time until the reset epoch, at
/// least one second, plus one second of slack. A missing or malformed reset
/// header counts as epoch 0.
pub fn rate_limit_wait(status: u16, remaining: Option<&str>, reset: Option<&str>, now_epoch: i64) -> Option<Duration> {
  if status != 403 && status != 429 {
    return None;
  }
  if remaining.map(str::trim) != Some("0") {
    return None;
  }

  let reset = reset.and_then(|r| r.trim().parse::<i64>().ok()).unwrap_or(0);
  let wait = reset.saturating_sub(now_epoch).max(1);
  Some(Duration::from_secs(wait.unsigned_abs() + 1))
}

/// Tracks the retry budget of a single resolution.
#[derive(Debug)]
pub struct RateLimitGuard {
  max_retries: u32,
  attempts: u32,
}

impl RateLimitGuard {
  pub fn new(max_retries: u32) -> Self {
    Self {
      max_retries,
      attempts: 0,
    }
  }

  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  /// Sleep for `delay` if the budget allows another retry.
  ///
  /// Returns false, without sleeping, once the budget is spent.
  pub async fn wait(&mut self, delay: Duration, repo: &str) -> bool {
    if self.attempts >= self.max_retries {
      warn!(repo = %repo, attempts = self.attempts, "rate limit retries exhausted");
      return false;
    }
    self.attempts += 1;
    warn!(
      repo = %repo,
      wait_secs = delay.as_secs(),
      attempt = self.attempts,
      max = self.max_retries,
      "rate limit exceeded, waiting before retry"
    );
    tokio::time::sleep(delay).await;
    true
  }
}
