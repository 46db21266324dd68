//! Asset downloads.
//!
//! Streams a resolved asset to disk in fixed-size chunks. The API token is
//! only attached for hosts on the release API's own domain.

use std::path::{Path, PathBuf};

use reqwest::header::{ACCEPT, AUTHORIZATION};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::consts::DOWNLOAD_CHUNK_SIZE;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  #[error("download of {url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub struct Downloader {
  client: reqwest::Client,
  session: Session,
}

impl Downloader {
  pub fn new(session: Session) -> Result<Self, FetchError> {
    let client = session.http_client().map_err(FetchError::Client)?;
    Ok(Self { client, session })
  }

  /// Download `url` to `dest`, returning whether it succeeded.
  ///
  /// Failures are logged and any partial file is removed.
  pub async fn download(&self, url: &str, dest: &Path) -> bool {
    match self.try_download(url, dest).await {
      Ok(bytes) => {
        info!(url = %url, path = %dest.display(), size = bytes, "download complete");
        true
      }
      Err(e) => {
        warn!(url = %url, error = %e, "download failed");
        if let Err(e) = fs::remove_file(dest).await {
          if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %dest.display(), error = %e, "could not remove partial download");
          }
        }
        false
      }
    }
  }

  /// Download `url` to `dest`, returning the number of bytes written.
  pub async fn try_download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
    info!(url = %url, "fetching asset");

    let write_err = |source| FetchError::Write {
      path: dest.to_path_buf(),
      source,
    };
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut request = self.client.get(url);
    if let Some(token) = self.session.token.as_deref() {
      if self.session.token_applies_to(url) {
        request = request
          .header(AUTHORIZATION, format!("token {token}"))
          .header(ACCEPT, "application/octet-stream");
      }
    }

    let mut response = request.send().await.map_err(|e| FetchError::Request {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }

    let file = fs::File::create(dest).await.map_err(write_err)?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Request {
      url: url.to_string(),
      message: e.to_string(),
    })? {
      writer.write_all(&chunk).await.map_err(write_err)?;
      written += chunk.len() as u64;
    }
    writer.flush().await.map_err(write_err)?;

    Ok(written)
  }
}

/// Local file name for a component's download: `{id}_{url basename}`.
///
/// The query string is dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`.
pub fn download_filename(component_id: &str, url: &str) -> String {
  let path = url.split(['?', '#']).next().unwrap_or(url);
  let basename = path.rsplit('/').next().unwrap_or(path);
  let basename = if basename.is_empty() || basename == "." || basename == ".." {
    "download"
  } else {
    basename
  };

  format!("{component_id}_{basename}")
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn filename_simple() {
    assert_eq!(
      download_filename("ams", "https://github.com/o/r/releases/download/1.9.0/atmosphere-1.9.0.zip"),
      "ams_atmosphere-1.9.0.zip"
    );
  }

  #[test]
  fn filename_drops_query() {
    assert_eq!(
      download_filename("sig", "https://example.com/sigpatches.zip?dl=1"),
      "sig_sigpatches.zip"
    );
  }

  #[test]
  fn filename_sanitizes_special_chars() {
    assert_eq!(
      download_filename("my tool", "https://example.com/file name (1).zip"),
      "my_tool_file_name__1_.zip"
    );
  }

  #[test]
  fn filename_fallback_for_empty_basename() {
    assert_eq!(download_filename("x", "https://example.com/"), "x_download");
  }

  mod http {
    use super::*;

    fn downloader(server: &mockito::Server, token: Option<&str>) -> Downloader {
      let session = Session::new()
        .with_api_base(server.url())
        .with_token(token.map(str::to_string));
      Downloader::new(session).unwrap()
    }

    #[tokio::test]
    async fn streams_body_to_disk() {
      let mut server = mockito::Server::new_async().await;
      let body = vec![7u8; DOWNLOAD_CHUNK_SIZE * 3 + 11];
      let _mock = server
        .mock("GET", "/asset.zip")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
      let temp = TempDir::new().unwrap();
      let dest = temp.path().join("nested/dir/asset.zip");

      let ok = downloader(&server, None)
        .download(&format!("{}/asset.zip", server.url()), &dest)
        .await;

      assert!(ok);
      assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn token_sent_to_api_domain() {
      let mut server = mockito::Server::new_async().await;
      let mock = server
        .mock("GET", "/asset.zip")
        .match_header("authorization", "token secret")
        .match_header("accept", "application/octet-stream")
        .with_status(200)
        .with_body("zip")
        .create_async()
        .await;
      let temp = TempDir::new().unwrap();

      let ok = downloader(&server, Some("secret"))
        .download(&format!("{}/asset.zip", server.url()), &temp.path().join("a.zip"))
        .await;

      assert!(ok);
      mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_withheld_from_foreign_host() {
      let mut server = mockito::Server::new_async().await;
      let mock = server
        .mock("GET", "/asset.zip")
        .match_header("authorization", mockito::Matcher::Missing)
        .with_status(200)
        .with_body("zip")
        .create_async()
        .await;
      let temp = TempDir::new().unwrap();
      // The token belongs to the public API, not to the test server.
      let session = Session::new().with_token(Some("secret".to_string()));
      let downloader = Downloader::new(session).unwrap();

      let ok = downloader
        .download(&format!("{}/asset.zip", server.url()), &temp.path().join("a.zip"))
        .await;

      assert!(ok);
      mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_returns_false_and_leaves_no_file() {
      let mut server = mockito::Server::new_async().await;
      let _mock = server
        .mock("GET", "/missing.zip")
        .with_status(404)
        .create_async()
        .await;
      let temp = TempDir::new().unwrap();
      let dest = temp.path().join("missing.zip");

      let ok = downloader(&server, None)
        .download(&format!("{}/missing.zip", server.url()), &dest)
        .await;

      assert!(!ok);
      assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unreachable_host_returns_false() {
      let temp = TempDir::new().unwrap();
      let downloader = Downloader::new(Session::new()).unwrap();

      let ok = downloader
        .download("http://127.0.0.1:1/asset.zip", &temp.path().join("a.zip"))
        .await;

      assert!(!ok);
    }

    /// Serve one response whose body trickles out a byte at a time.
    async fn trickle_server(body: &'static [u8], gap: std::time::Duration) -> String {
      use tokio::io::AsyncReadExt;

      let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
      let addr = listener.local_addr().unwrap();
      tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        let head = format!(
          "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
          body.len()
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
          return;
        }
        for byte in body {
          tokio::time::sleep(gap).await;
          // The client may already have given up.
          if socket.write_all(&[*byte]).await.is_err() || socket.flush().await.is_err() {
            return;
          }
        }
      });
      format!("http://{addr}/slow.zip")
    }

    #[tokio::test]
    async fn slow_download_outlives_idle_timeout() {
      let body: &'static [u8] = b"trickle";
      let url = trickle_server(body, std::time::Duration::from_millis(300)).await;
      let temp = TempDir::new().unwrap();
      let dest = temp.path().join("slow.zip");
      // The whole transfer takes about 2s; no single gap reaches the limit.
      let session = Session::new().with_idle_timeout(std::time::Duration::from_secs(1));
      let downloader = Downloader::new(session).unwrap();

      let written = downloader.try_download(&url, &dest).await.unwrap();

      assert_eq!(written, body.len() as u64);
      assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn stalled_download_fails() {
      let url = trickle_server(b"ab", std::time::Duration::from_secs(3)).await;
      let temp = TempDir::new().unwrap();
      let dest = temp.path().join("stalled.zip");
      let session = Session::new().with_idle_timeout(std::time::Duration::from_millis(500));
      let downloader = Downloader::new(session).unwrap();

      assert!(!downloader.download(&url, &dest).await);
      assert!(!dest.exists());
    }
  }
}
