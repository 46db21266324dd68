//! Release API transport.
//!
//! [`ReleaseApi`] is the seam between the resolver and the network: the
//! resolver only sees classified [`ApiResponse`]s, which keeps the cache and
//! retry logic testable without a server.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, ETAG, HeaderMap, IF_NONE_MATCH};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::ratelimit::{REMAINING_HEADER, RESET_HEADER, rate_limit_wait};
use crate::session::Session;

const API_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
  #[serde(default)]
  pub tag_name: Option<String>,
  #[serde(default)]
  pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
  pub name: String,
  pub browser_download_url: String,
}

/// A classified API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
  /// 2xx with the raw body and the response validator, if any.
  Ok { body: String, etag: Option<String> },
  /// 304: the conditional request matched.
  NotModified,
  /// Quota exhausted; retry after `wait`.
  RateLimited { wait: Duration },
  /// Any other non-2xx status.
  Failed { status: u16 },
}

/// Issues release API GETs.
pub trait ReleaseApi {
  /// GET `url`, sending `If-None-Match: etag` when given.
  fn get(&self, url: &str, etag: Option<&str>) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// Release API client over reqwest.
#[derive(Debug, Clone)]
pub struct HttpReleaseApi {
  client: reqwest::Client,
  token: Option<String>,
}

impl HttpReleaseApi {
  pub fn new(session: &Session) -> Result<Self, ApiError> {
    Ok(Self {
      client: session.http_client().map_err(ApiError::Client)?,
      token: session.token.clone(),
    })
  }
}

impl ReleaseApi for HttpReleaseApi {
  async fn get(&self, url: &str, etag: Option<&str>) -> Result<ApiResponse, ApiError> {
    let mut request = self.client.get(url).header(ACCEPT, API_ACCEPT);
    if let Some(token) = &self.token {
      request = request.header(AUTHORIZATION, format!("token {token}"));
    }
    if let Some(etag) = etag {
      request = request.header(IF_NONE_MATCH, etag);
    }

    debug!(url = %url, conditional = etag.is_some(), "querying release API");
    let response = request.send().await.map_err(|source| ApiError::Request {
      url: url.to_string(),
      source,
    })?;

    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
      return Ok(ApiResponse::NotModified);
    }

    let headers = response.headers();
    if let Some(wait) = rate_limit_wait(
      status.as_u16(),
      header_str(headers, REMAINING_HEADER),
      header_str(headers, RESET_HEADER),
      Utc::now().timestamp(),
    ) {
      return Ok(ApiResponse::RateLimited { wait });
    }

    if !status.is_success() {
      return Ok(ApiResponse::Failed {
        status: status.as_u16(),
      });
    }

    let etag = header_str(headers, ETAG.as_str()).map(str::to_string);
    let body = response.text().await.map_err(|source| ApiError::Request {
      url: url.to_string(),
      source,
    })?;
    Ok(ApiResponse::Ok { body, etag })
  }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers.get(name).and_then(|v| v.to_str().ok())
}

/// URL of a pinned release, or of the release list when no tag is pinned.
pub fn release_url(api_base: &str, repo: &str, tag: Option<&str>) -> String {
  let base = api_base.trim_end_matches('/');
  match tag {
    Some(tag) => format!("{base}/repos/{repo}/releases/tags/{tag}"),
    None => format!("{base}/repos/{repo}/releases"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn release_urls() {
    assert_eq!(
      release_url("https://api.github.com", "o/r", None),
      "https://api.github.com/repos/o/r/releases"
    );
    assert_eq!(
      release_url("https://api.github.com/", "o/r", Some("v1.2")),
      "https://api.github.com/repos/o/r/releases/tags/v1.2"
    );
  }

  mod http {
    use super::*;

    fn api(server: &mockito::Server) -> HttpReleaseApi {
      let session = Session::new()
        .with_api_base(server.url())
        .with_token(Some("secret".to_string()));
      HttpReleaseApi::new(&session).unwrap()
    }

    #[tokio::test]
    async fn ok_response_carries_body_and_etag() {
      let mut server = mockito::Server::new_async().await;
      let mock = server
        .mock("GET", "/repos/o/r/releases")
        .match_header("accept", API_ACCEPT)
        .match_header("authorization", "token secret")
        .with_status(200)
        .with_header("etag", "\"v1\"")
        .with_body("[]")
        .create_async()
        .await;

      let url = release_url(&server.url(), "o/r", None);
      let response = api(&server).get(&url, None).await.unwrap();

      assert_eq!(
        response,
        ApiResponse::Ok {
          body: "[]".to_string(),
          etag: Some("\"v1\"".to_string())
        }
      );
      mock.assert_async().await;
    }

    #[tokio::test]
    async fn conditional_request_maps_304() {
      let mut server = mockito::Server::new_async().await;
      let mock = server
        .mock("GET", "/repos/o/r/releases")
        .match_header("if-none-match", "\"v1\"")
        .with_status(304)
        .create_async()
        .await;

      let url = release_url(&server.url(), "o/r", None);
      let response = api(&server).get(&url, Some("\"v1\"")).await.unwrap();

      assert_eq!(response, ApiResponse::NotModified);
      mock.assert_async().await;
    }

    #[tokio::test]
    async fn exhausted_quota_is_rate_limited() {
      let mut server = mockito::Server::new_async().await;
      let _mock = server
        .mock("GET", "/repos/o/r/releases")
        .with_status(403)
        .with_header("x-ratelimit-remaining", "0")
        .with_header("x-ratelimit-reset", "0")
        .create_async()
        .await;

      let url = release_url(&server.url(), "o/r", None);
      let response = api(&server).get(&url, None).await.unwrap();

      assert_eq!(
        response,
        ApiResponse::RateLimited {
          wait: Duration::from_secs(2)
        }
      );
    }

    #[tokio::test]
    async fn forbidden_with_quota_left_is_a_failure() {
      let mut server = mockito::Server::new_async().await;
      let _mock = server
        .mock("GET", "/repos/o/r/releases")
        .with_status(403)
        .with_header("x-ratelimit-remaining", "10")
        .create_async()
        .await;

      let url = release_url(&server.url(), "o/r", None);
      let response = api(&server).get(&url, None).await.unwrap();

      assert_eq!(response, ApiResponse::Failed { status: 403 });
    }
  }
}
