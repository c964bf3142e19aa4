//! Token refresher for the evaluation service.
//!
//! Exchanges the registration credentials for a short-lived access token and
//! keeps it until shortly before it expires. Concurrent callers that find the
//! cache stale wait on a single refresh instead of each hitting the auth
//! endpoint.

use super::{AuthError, TokenProvider};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};
use url::Url;

pub const DEFAULT_AUTH_URL: &str = "http://20.244.56.144/evaluation-service/auth";

/// Refresh this long before the server-reported expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);
const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Registration details posted to the auth endpoint.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub name: String,
    #[serde(rename = "rollNo")]
    pub roll_no: String,
    #[serde(rename = "accessCode")]
    pub access_code: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("roll_no", &self.roll_no)
            .field("access_code", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

pub struct TokenRefresher {
    client: Client,
    auth_url: Url,
    credentials: Credentials,
    cache: RwLock<Option<CachedToken>>,
    refresh_gate: Mutex<()>,
}

impl TokenRefresher {
    pub fn new(auth_url: &str, credentials: Credentials) -> Result<Self, AuthError> {
        let auth_url = Url::parse(auth_url)
            .map_err(|e| AuthError::InvalidUrl(format!("'{auth_url}': {e}")))?;

        let client = Client::builder()
            .timeout(AUTH_REQUEST_TIMEOUT)
            .user_agent(concat!("eval-log-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            auth_url,
            credentials,
            cache: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Drops the cached token so the next call fetches a new one.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    fn cached(&self) -> Option<String> {
        let now = Instant::now();
        self.cache
            .read()
            .as_ref()
            .filter(|token| token.is_fresh(now))
            .map(|token| token.value.clone())
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        debug!("Requesting access token from {}", self.auth_url);

        let response = self
            .client
            .post(self.auth_url.clone())
            .json(&self.credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(AuthError::Empty);
        }

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_SKEW);
        info!("Obtained access token valid for {:?} before refresh", lifetime);

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

impl TokenProvider for TokenRefresher {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        match self.fetch().await {
            Ok(token) => {
                let value = token.value.clone();
                *self.cache.write() = Some(token);
                Ok(value)
            }
            Err(e) => {
                error!("Failed to fetch token: {}", e);
                Err(e)
            }
        }
    }
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("auth_url", &self.auth_url.as_str())
            .field("credentials", &self.credentials)
            .field("cached", &self.cache.read().is_some())
            .finish()
    }
}
