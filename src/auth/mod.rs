//! Bearer-token providers.
//!
//! The submitter only needs "a token or a reason there is none"; everything
//! about where the token comes from lives behind [`TokenProvider`].

pub mod refresh;

pub use refresh::{Credentials, DEFAULT_AUTH_URL, TokenRefresher};

use std::future::Future;
use thiserror::Error;

/// Environment variables consulted by [`EnvToken`], in order.
pub const TOKEN_ENV_VARS: [&str; 3] = ["TOKEN", "LOGGER_AUTH_TOKEN", "AUTH_TOKEN"];

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Auth token not found. Set TOKEN, LOGGER_AUTH_TOKEN, or AUTH_TOKEN in your environment")]
    NotFound,
    #[error("Auth token is empty")]
    Empty,
    #[error("Auth token contains characters not allowed in a header")]
    InvalidToken,
    #[error("Invalid auth URL {0}")]
    InvalidUrl(String),
    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Auth service responded {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Auth service response could not be read: {0}")]
    MalformedResponse(String),
}

/// Supplies a bearer token for one submission.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> impl Future<Output = Result<String, AuthError>> + Send;
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        self.0.clone().ok_or(AuthError::NotFound)
    }
}

/// Reads the token from the process environment on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    vars: Vec<String>,
}

impl EnvToken {
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lookup(&self) -> Option<String> {
        self.vars
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VARS)
    }
}

impl TokenProvider for EnvToken {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        self.lookup().ok_or(AuthError::NotFound)
    }
}

/// Adapts a plain `Fn() -> Option<String>` into a provider.
pub struct FnToken<F>(pub F);

impl<F> TokenProvider for FnToken<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    async fn bearer_token(&self) -> Result<String, AuthError> {
        (self.0)().ok_or(AuthError::NotFound)
    }
}

impl<P: TokenProvider> TokenProvider for Option<P> {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match self {
            Some(provider) => provider.bearer_token().await,
            None => Err(AuthError::NotFound),
        }
    }
}

/// Tries `primary` first and falls back to `secondary` on any failure.
#[derive(Debug, Clone)]
pub struct FallbackToken<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FallbackToken<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A, B> TokenProvider for FallbackToken<A, B>
where
    A: TokenProvider,
    B: TokenProvider,
{
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match self.primary.bearer_token().await {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            Ok(_) | Err(_) => self.secondary.bearer_token().await,
        }
    }
}
