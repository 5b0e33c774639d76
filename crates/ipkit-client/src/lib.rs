//! HTTP client for the external lookup services
//!
//! Provides async HTTP client with:
//! - Public-IP lookup (ipify style)
//! - Geolocation lookup (ip-api style)
//! - Automatic retries with exponential backoff
//! - Rate limiting
//! - Timeout configuration
//!
//! Every call is a fresh request/response exchange. A failed call returns a
//! [`LookupError`] and nothing else; no result from an earlier call is kept.
//!
//! # Examples
//!
//! ```no_run
//! use ipkit_client::LookupClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LookupClient::new()?;
//! let ip = client.public_ip().await?;
//! let location = client.geolocate(Some(ip)).await?;
//! println!("{} is in {:?}", ip, location.country);
//! # Ok(())
//! # }
//! ```

use governor::{Quota, RateLimiter};
use ipkit_core::config::LookupConfig;
use ipkit_core::Ipv4Address;
use ipkit_geoip::{GeoIpError, GeoLocation};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Service answered with a non-success status code
    #[error("Service returned HTTP {0}")]
    Status(u16),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {0}s")]
    RateLimited(u64),

    /// Timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Service reported that the lookup failed
    #[error("Lookup failed: {0}")]
    Failed(String),
}

impl LookupError {
    /// Whether another attempt may succeed
    fn is_retryable(&self) -> bool {
        match self {
            LookupError::RequestFailed(_) | LookupError::Timeout(_) => true,
            LookupError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<GeoIpError> for LookupError {
    fn from(err: GeoIpError) -> Self {
        match err {
            GeoIpError::LookupFailed(msg) => LookupError::Failed(msg),
            GeoIpError::InvalidResponse(msg) => LookupError::InvalidResponse(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

/// ipify JSON payload
#[derive(Debug, Deserialize)]
struct PublicIpResponse {
    ip: Option<String>,
}

/// HTTP client for the public-IP and geolocation services
pub struct LookupClient {
    client: Client,
    config: LookupConfig,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
            governor::middleware::NoOpMiddleware,
        >,
    >,
}

impl LookupClient {
    /// Create a client with the default endpoints
    ///
    /// # Examples
    ///
    /// ```
    /// use ipkit_client::LookupClient;
    ///
    /// let client = LookupClient::new().unwrap();
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(LookupConfig::default())
    }

    /// Create client with custom configuration
    pub fn with_config(config: LookupConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ipkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Client(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Look up the caller's public IPv4 address
    pub async fn public_ip(&self) -> Result<Ipv4Address> {
        let body = self.fetch(&self.config.public_ip_url).await?;
        Self::parse_public_ip(&body)
    }

    /// Look up the location of an address, or of the caller when `None`
    pub async fn geolocate(&self, ip: Option<Ipv4Address>) -> Result<GeoLocation> {
        let url = self.geolocation_url(ip);
        let body = self.fetch(&url).await?;
        Ok(GeoLocation::from_json(&body)?)
    }

    fn geolocation_url(&self, ip: Option<Ipv4Address>) -> String {
        let base = self.config.geolocation_url.trim_end_matches('/');
        match ip {
            Some(ip) => format!("{}/{}", base, ip),
            None => base.to_string(),
        }
    }

    /// GET with rate limiting and retries
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut retries = 0;
        let mut backoff = Duration::from_millis(100);

        loop {
            self.rate_limiter.until_ready().await;
            debug!(url, attempt = retries + 1, "sending lookup request");

            match self.make_request(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    warn!(url, error = %e, retry = retries, "lookup request failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn make_request(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(self.config.timeout)
            } else {
                LookupError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(LookupError::RateLimited(retry_after));
        }

        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }

    /// Parse `{"ip": "..."}` or a bare address body
    fn parse_public_ip(body: &str) -> Result<Ipv4Address> {
        let text = match serde_json::from_str::<PublicIpResponse>(body) {
            Ok(PublicIpResponse { ip: Some(ip) }) => ip,
            Ok(PublicIpResponse { ip: None }) => {
                return Err(LookupError::InvalidResponse(
                    "missing 'ip' field".to_string(),
                ))
            }
            Err(_) => body.trim().to_string(),
        };

        Ipv4Address::parse(&text).map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_test::assert_err;

    /// Serve one canned response per connection, reporting each request line
    async fn serve(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        serve_with_headers(responses.into_iter().map(|(s, b)| (s, "", b)).collect()).await
    }

    /// Like `serve`, with extra header lines (each ending in `\r\n`) per reply
    async fn serve_with_headers(
        responses: Vec<(u16, &'static str, &'static str)>,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, headers, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let request = String::from_utf8_lossy(&request);
                let line = request.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(line);

                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    headers,
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (format!("http://{}", addr), rx)
    }

    fn client_for(base: &str, max_retries: u32) -> LookupClient {
        LookupClient::with_config(LookupConfig {
            public_ip_url: format!("{}/ip", base),
            geolocation_url: format!("{}/json/", base),
            timeout: Duration::from_secs(5),
            max_retries,
            requests_per_second: 100,
        })
        .unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = LookupClient::new().unwrap();
        assert_eq!(client.config().max_retries, 3);
        assert_eq!(client.config().geolocation_url, "http://ip-api.com/json");
    }

    #[test]
    fn test_geolocation_url() {
        let client = client_for("http://geo.test", 0);
        assert_eq!(client.geolocation_url(None), "http://geo.test/json");
        let ip = Ipv4Address::parse("8.8.8.8").unwrap();
        assert_eq!(client.geolocation_url(Some(ip)), "http://geo.test/json/8.8.8.8");
    }

    #[test]
    fn test_parse_public_ip() {
        let expected = Ipv4Address::parse("203.0.113.7").unwrap();
        assert_eq!(
            LookupClient::parse_public_ip(r#"{"ip":"203.0.113.7"}"#).unwrap(),
            expected
        );
        assert_eq!(LookupClient::parse_public_ip("203.0.113.7\n").unwrap(), expected);
    }

    #[test]
    fn test_parse_public_ip_invalid() {
        assert!(matches!(
            LookupClient::parse_public_ip(r#"{"address":"1.2.3.4"}"#).unwrap_err(),
            LookupError::InvalidResponse(_)
        ));
        assert!(matches!(
            LookupClient::parse_public_ip(r#"{"ip":"2001:db8::1"}"#).unwrap_err(),
            LookupError::InvalidResponse(_)
        ));
        assert!(matches!(
            LookupClient::parse_public_ip("<html>").unwrap_err(),
            LookupError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(LookupError::RequestFailed("reset".to_string()).is_retryable());
        assert!(LookupError::Status(503).is_retryable());
        assert!(!LookupError::Status(404).is_retryable());
        assert!(!LookupError::Failed("private range".to_string()).is_retryable());
        assert!(!LookupError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_geoip_error_conversion() {
        let err: LookupError = GeoIpError::LookupFailed("reserved range".to_string()).into();
        assert_eq!(err, LookupError::Failed("reserved range".to_string()));
    }

    #[tokio::test]
    async fn test_public_ip_lookup() {
        let (base, mut requests) = serve(vec![(200, r#"{"ip":"198.51.100.4"}"#)]).await;
        let client = client_for(&base, 0);

        let ip = client.public_ip().await.unwrap();
        assert_eq!(ip.to_string(), "198.51.100.4");
        assert_eq!(requests.recv().await.unwrap(), "GET /ip HTTP/1.1");
    }

    #[tokio::test]
    async fn test_geolocate_success() {
        let body = r#"{"status":"success","query":"8.8.8.8","country":"United States","countryCode":"US","city":"Ashburn","lat":39.03,"lon":-77.5}"#;
        let (base, mut requests) = serve(vec![(200, body)]).await;
        let client = client_for(&base, 0);

        let ip = Ipv4Address::parse("8.8.8.8").unwrap();
        let location = client.geolocate(Some(ip)).await.unwrap();
        assert_eq!(location.city.as_deref(), Some("Ashburn"));
        assert_eq!(requests.recv().await.unwrap(), "GET /json/8.8.8.8 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_geolocate_fail_status() {
        let body = r#"{"status":"fail","message":"private range","query":"10.0.0.1"}"#;
        let (base, _requests) = serve(vec![(200, body)]).await;
        let client = client_for(&base, 3);

        let ip = Ipv4Address::parse("10.0.0.1").unwrap();
        let err = client.geolocate(Some(ip)).await.unwrap_err();
        assert_eq!(err, LookupError::Failed("private range".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (base, mut requests) =
            serve(vec![(500, "{}"), (200, r#"{"ip":"192.0.2.1"}"#)]).await;
        let client = client_for(&base, 1);

        let ip = client.public_ip().await.unwrap();
        assert_eq!(ip.to_string(), "192.0.2.1");
        assert!(requests.recv().await.is_some());
        assert!(requests.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base, _requests) = serve(vec![(404, "{}")]).await;
        let client = client_for(&base, 3);

        let err = client.public_ip().await.unwrap_err();
        assert_eq!(err, LookupError::Status(404));
    }

    #[tokio::test]
    async fn test_rate_limited_reads_retry_after() {
        let (base, mut requests) =
            serve_with_headers(vec![(429, "Retry-After: 17\r\n", "{}")]).await;
        let client = client_for(&base, 3);

        let err = client.public_ip().await.unwrap_err();
        assert_eq!(err, LookupError::RateLimited(17));
        assert!(!err.is_retryable());
        assert!(requests.recv().await.is_some());
        assert!(requests.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_default_wait() {
        let (base, _requests) = serve(vec![(429, "{}")]).await;
        let client = client_for(&base, 0);

        let err = client.public_ip().await.unwrap_err();
        assert_eq!(err, LookupError::RateLimited(60));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = client_for(&base, 0);
        let result = client.public_ip().await;
        assert_err!(&result);
        assert!(matches!(result.unwrap_err(), LookupError::RequestFailed(_)));
    }
}
