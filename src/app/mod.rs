pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogLevel};
pub use logging_system::{LogDirective, LoggingInitError, LoggingSystem, setup_logging};

use crate::auth::{AuthError, EnvToken, FallbackToken, TokenRefresher};
use crate::domain::{LogEvent, ValidationError};
use crate::sender::{LogReceipt, LogSubmitter, SubmitError};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Environment token first, then the credential exchange when configured.
pub type CliTokenProvider = FallbackToken<EnvToken, Option<TokenRefresher>>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Token provider setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("Invalid --json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing event fields: expected <stack> <level> <package> <message> or --json")]
    MissingEvent,
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Submit(SubmitError::InvalidField(e))
    }
}

pub struct App {
    config: Config,
    submitter: LogSubmitter<CliTokenProvider>,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let refresher = config
            .credentials()?
            .map(|credentials| TokenRefresher::new(&config.auth_url, credentials))
            .transpose()?;

        if refresher.is_some() {
            debug!("Token refresher configured against {}", config.auth_url);
        }

        let provider = FallbackToken::new(EnvToken::default(), refresher);
        let submitter = LogSubmitter::new(provider)?
            .with_retry_policy(config.retry_policy())
            .with_validator(config.validator());

        Ok(Self { config, submitter })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the event from `--json` or the four positional fields.
    pub fn event(&self) -> Result<LogEvent, AppError> {
        let validator = self.config.validator();

        if let Some(raw) = &self.config.json {
            let value: Value = serde_json::from_str(raw)?;
            return Ok(validator.validate_value(&value)?);
        }

        match (
            &self.config.stack,
            &self.config.level,
            &self.config.package,
            &self.config.message,
        ) {
            (Some(stack), Some(level), Some(package), Some(message)) => {
                Ok(validator.validate(stack, level, package, message)?)
            }
            _ => Err(AppError::MissingEvent),
        }
    }

    pub async fn run(self, cancel: &CancellationToken) -> Result<LogReceipt, AppError> {
        let event = self.event()?;
        let options = self.config.submission_options();

        let receipt = self
            .submitter
            .submit_event_with_cancel(&event, &options, cancel)
            .await?;

        let stats = self.submitter.stats();
        info!(
            "Submission finished: attempts={}, retries={}",
            stats.attempts, stats.retries
        );
        Ok(receipt)
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Loads a `.env` file from the working directory (or a parent) into the
/// process environment. Variables already set are left untouched.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    load_dotenv();

    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        // --help, --version and usage errors are rendered by clap itself
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = setup_logging(config.log_level, &config.log_directives) {
        eprintln!("Warning: {e}");
    }

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Initialization error: {}", e);
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    match app.run(&cancel).await {
        Ok(receipt) => {
            println!("{}", serde_json::to_string(&receipt)?);
            Ok(())
        }
        Err(e) => {
            error!("Log submission failed: {}", e);
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
