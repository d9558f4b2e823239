//! Image to data URL resolution
//!
//! Captured images are embedded in the quote as data URLs so the quote stays
//! readable after the page (or its CDN) goes away. Resolution never fails:
//! an image that cannot be fetched is embedded with an empty source.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Fetches an image and returns it as a base64 data URL
#[async_trait]
pub trait DataUrlResolver: Send + Sync {
    /// Resolve an absolute image source; returns `""` on failure
    async fn resolve(&self, src: &str) -> String;
}

/// Resolver backed by an HTTP client
pub struct HttpDataUrlResolver {
    client: reqwest::Client,
}

impl HttpDataUrlResolver {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, src: &str) -> Result<String, FetchError> {
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            return Err(FetchError::Unsupported(src.to_string()));
        }

        let response = self.client.get(src).send().await.map_err(FetchError::Request)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let bytes = response.bytes().await.map_err(FetchError::Body)?;

        let mime = header_mime.unwrap_or_else(|| guess_mime(src));
        Ok(to_data_url(&mime, &bytes))
    }
}

#[async_trait]
impl DataUrlResolver for HttpDataUrlResolver {
    async fn resolve(&self, src: &str) -> String {
        if src.starts_with("data:") {
            return src.to_string();
        }
        match self.fetch(src).await {
            Ok(data_url) => {
                debug!(src, bytes = data_url.len(), "Image embedded");
                data_url
            }
            Err(e) => {
                warn!(src, error = %e, "Failed to fetch image");
                String::new()
            }
        }
    }
}

/// Resolver that never touches the network
///
/// Data URLs pass through; every other source resolves to `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDataUrlResolver;

#[async_trait]
impl DataUrlResolver for OfflineDataUrlResolver {
    async fn resolve(&self, src: &str) -> String {
        if src.starts_with("data:") {
            src.to_string()
        } else {
            String::new()
        }
    }
}

/// MIME type from the source's file extension
fn guess_mime(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Encode bytes as a base64 data URL
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Resolver returning canned data URLs, for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockResolver {
    pub responses: std::collections::HashMap<String, String>,
    pub calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
#[async_trait]
impl DataUrlResolver for MockResolver {
    async fn resolve(&self, src: &str) -> String {
        self.calls.lock().push(src.to_string());
        self.responses.get(src).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("https://x.com/a/cat.png?size=2"), "image/png");
        assert_eq!(guess_mime("https://x.com/photo.jpg"), "image/jpeg");
        assert_eq!(guess_mime("https://x.com/blob"), "application/octet-stream");
    }

    #[test]
    fn test_to_data_url() {
        assert_eq!(to_data_url("image/gif", b"GIF"), "data:image/gif;base64,R0lG");
    }

    #[tokio::test]
    async fn test_data_urls_pass_through() {
        let resolver = HttpDataUrlResolver::new(&FetchConfig::default()).unwrap();
        assert_eq!(resolver.resolve("data:image/png;base64,AA==").await, "data:image/png;base64,AA==");
        assert_eq!(resolver.resolve("ftp://x.com/a.png").await, "");
    }

    /// Serve one canned HTTP response on a local port
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/img.png", addr)
    }

    fn local_resolver() -> HttpDataUrlResolver {
        HttpDataUrlResolver {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_fetch_embeds_body_with_header_mime() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: image/gif; charset=binary\r\nContent-Length: 3\r\nConnection: close\r\n\r\nGIF",
        )
        .await;

        assert_eq!(local_resolver().resolve(&url).await, "data:image/gif;base64,R0lG");
    }

    #[tokio::test]
    async fn test_fetch_reports_status() {
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let resolver = local_resolver();

        let err = resolver.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(status) if status == reqwest::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_empty() {
        let url = serve_once(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        assert_eq!(local_resolver().resolve(&url).await, "");

        let err = local_resolver().fetch("ftp://x.com/a.png").await.unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_offline_resolver() {
        let resolver = OfflineDataUrlResolver;
        assert_eq!(resolver.resolve("data:image/gif;base64,R0lG").await, "data:image/gif;base64,R0lG");
        assert_eq!(resolver.resolve("https://x.com/a.png").await, "");
    }
}
