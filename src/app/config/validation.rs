use super::{Config, ConfigError};
use crate::app::logging_system::LogDirective;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid API URL '{}': {}", self.api_url, e))
        })?;

        Url::parse(&self.auth_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid auth URL '{}': {}", self.auth_url, e))
        })?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry_policy.max_delay < self.retry_policy.base_delay {
            return Err(ConfigError::InvalidConfig(format!(
                "Retry max delay ({:?}) must be at least the base delay ({:?})",
                self.retry_policy.max_delay, self.retry_policy.base_delay
            )));
        }

        for directive in &self.log_directives {
            LogDirective::parse(directive)
                .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        }

        // All-or-nothing: a partial credential set is almost always a typo.
        self.credentials()?;

        Ok(())
    }
}
