use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose status line and headers have arrived. The body is read
/// separately so the submitter can bound the two phases independently.
pub trait ResponseBody: Send {
    fn status(&self) -> u16;

    fn read_body(self) -> impl Future<Output = Result<Bytes, TransportError>> + Send;
}

impl ResponseBody for TransportResponse {
    fn status(&self) -> u16 {
        self.status
    }

    async fn read_body(self) -> Result<Bytes, TransportError> {
        Ok(self.body)
    }
}

impl ResponseBody for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    async fn read_body(self) -> Result<Bytes, TransportError> {
        Ok(self.bytes().await?)
    }
}

/// One POST of an encoded body. The submitter owns timeouts and retries, so
/// implementations should make a single attempt and return once the response
/// head is available.
pub trait Transport: Send + Sync {
    type Response: ResponseBody;

    fn post(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> impl Future<Output = Result<Self::Response, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connection_timeout: Duration,
    pub max_idle_per_host: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            max_idle_per_host: 8,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: concat!("eval-log-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed transport with a pooled client.
///
/// Dropping the future returned by [`Transport::post`], or the response it
/// yields, aborts the request, so a timed-out attempt does not linger.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    type Response = reqwest::Response;

    async fn post(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, TransportError> {
        self.client
            .post(url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connection(e.to_string())
                } else {
                    TransportError::Network(e)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(TransportResponse::new(201, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
        assert!(TransportResponse::new(404, "").is_client_error());
        assert!(!TransportResponse::new(500, "").is_client_error());
    }

    #[tokio::test]
    async fn test_in_memory_response_body() {
        let response = TransportResponse::new(201, "created");
        assert_eq!(ResponseBody::status(&response), 201);
        assert_eq!(response.read_body().await.unwrap(), Bytes::from_static(b"created"));
    }

    #[test]
    fn test_body_text_is_lossy() {
        let response = TransportResponse::new(400, Bytes::from_static(b"bad \xff input"));
        assert_eq!(response.body_text(), "bad \u{fffd} input");
    }

    #[tokio::test]
    async fn test_default_transport_builds() {
        let transport = HttpTransport::new(TransportConfig::default()).unwrap();
        assert!(transport.config().user_agent.starts_with("eval-log-client/"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        let transport = HttpTransport::new(TransportConfig {
            connection_timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        // Port 9 (discard) is closed on test machines.
        let url = Url::parse("http://127.0.0.1:9/logs").unwrap();
        let result = transport.post(&url, HeaderMap::new(), Bytes::new()).await;

        assert!(matches!(
            result,
            Err(TransportError::Connection(_)) | Err(TransportError::Network(_))
        ));
    }
}
