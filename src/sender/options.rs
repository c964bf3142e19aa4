use super::SubmitError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://20.244.56.144/evaluation-service/logs";
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Per-call overrides. Unset fields take the defaults above.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionOptions {
    pub api_url: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout: Option<Duration>,
}

/// Options after defaults are applied and values checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub api_url: Url,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl SubmissionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn resolve(&self) -> Result<ResolvedOptions, SubmitError> {
        let raw_url = self
            .api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL);

        let api_url = Url::parse(raw_url).map_err(|e| {
            SubmitError::InvalidOptions(format!("Invalid API URL '{raw_url}': {e}"))
        })?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(SubmitError::InvalidOptions(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(ResolvedOptions {
            api_url,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            timeout,
        })
    }
}
