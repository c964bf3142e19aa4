use super::{ConfigError, LogLevel};
use crate::auth::{Credentials, DEFAULT_AUTH_URL};
use crate::domain::Validator;
use crate::reliability::RetryPolicy;
use crate::sender::{DEFAULT_API_URL, SubmissionOptions};
use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "eval-log", author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Stack that emitted the event (backend, frontend)
    #[serde(skip)]
    pub stack: Option<String>,

    /// Event severity (debug, info, warn, error, fatal)
    #[serde(skip)]
    pub level: Option<String>,

    /// Package the event originates from (e.g. handler, db, component)
    #[serde(skip)]
    pub package: Option<String>,

    /// Free-form log message
    #[serde(skip)]
    pub message: Option<String>,

    /// Submit a JSON object {"stack","level","package","message"} instead of positional fields
    #[arg(long, conflicts_with_all = ["stack", "level", "package", "message"])]
    #[serde(skip)]
    pub json: Option<String>,

    /// Logging API endpoint URL
    #[arg(long, env = "LOG_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Retries after the first failed attempt
    #[arg(long, env = "MAX_RETRIES", default_value = "2")]
    pub max_retries: u32,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "TIMEOUT_MS", default_value = "8000")]
    pub timeout_ms: u64,

    /// Retry 4xx responses like timeouts and 5xx responses
    #[arg(long, env = "RETRY_CLIENT_ERRORS", default_value_t = true, action = ArgAction::Set)]
    pub retry_client_errors: bool,

    /// Reject packages that do not belong to the event's stack
    #[arg(long, env = "STRICT_PACKAGE_SCOPE")]
    pub strict_package_scope: bool,

    /// Log level for the client's own diagnostics (written to stderr)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,

    /// Per-target log filter, e.g. `reqwest=debug` (repeatable)
    #[arg(long = "log-directive", env = "LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// Auth endpoint used when no token is present in the environment
    #[arg(long, env = "AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    #[arg(long, env = "AUTH_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "AUTH_NAME")]
    pub name: Option<String>,

    #[arg(long, env = "ROLL_NO")]
    pub roll_no: Option<String>,

    #[arg(long, env = "ACCESS_CODE")]
    pub access_code: Option<String>,

    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub timeout: Duration,

    /// Backoff shape; only `retry_client_errors` is exposed as a CLI arg
    #[serde(rename = "retry")]
    #[arg(skip)]
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack: None,
            level: None,
            package: None,
            message: None,
            json: None,
            api_url: DEFAULT_API_URL.to_string(),
            max_retries: 2,
            timeout_ms: 8000,
            retry_client_errors: true,
            strict_package_scope: false,
            log_level: LogLevel::Warn,
            log_directives: Vec::new(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            email: None,
            name: None,
            roll_no: None,
            access_code: None,
            client_id: None,
            client_secret: None,
            config_file: None,
            timeout: Duration::from_millis(8000),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Config::command().try_get_matches_from(args)?;
        let mut config = Config::from_arg_matches(&matches)?;

        if let Some(path) = config.config_file.clone() {
            let file_config = Self::read_file(&path)?;
            config.merge_file(file_config, &matches);
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Takes each value from a config file unless it was given on the command
    /// line or through the environment.
    fn merge_file(&mut self, file: Config, matches: &ArgMatches) {
        let explicit = |id: &str| {
            matches!(
                matches.value_source(id),
                Some(ValueSource::CommandLine | ValueSource::EnvVariable)
            )
        };

        if !explicit("api_url") {
            self.api_url = file.api_url;
        }
        if !explicit("max_retries") {
            self.max_retries = file.max_retries;
        }
        if !explicit("timeout_ms") {
            self.timeout_ms = file.timeout_ms;
        }
        if !explicit("retry_client_errors") {
            self.retry_client_errors = file.retry_client_errors;
        }
        if !explicit("strict_package_scope") {
            self.strict_package_scope = file.strict_package_scope;
        }
        if !explicit("log_level") {
            self.log_level = file.log_level;
        }
        if !explicit("log_directives") {
            self.log_directives = file.log_directives;
        }
        if !explicit("auth_url") {
            self.auth_url = file.auth_url;
        }
        if !explicit("email") {
            self.email = file.email;
        }
        if !explicit("name") {
            self.name = file.name;
        }
        if !explicit("roll_no") {
            self.roll_no = file.roll_no;
        }
        if !explicit("access_code") {
            self.access_code = file.access_code;
        }
        if !explicit("client_id") {
            self.client_id = file.client_id;
        }
        if !explicit("client_secret") {
            self.client_secret = file.client_secret;
        }
        self.retry_policy = file.retry_policy;
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.timeout = Duration::from_millis(self.timeout_ms);
        self.retry_policy.retry_client_errors =
            self.retry_client_errors && self.retry_policy.retry_client_errors;
        Ok(())
    }

    pub fn submission_options(&self) -> SubmissionOptions {
        SubmissionOptions::new()
            .with_api_url(self.api_url.clone())
            .with_max_retries(self.max_retries)
            .with_timeout(self.timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy.clone()
    }

    pub fn validator(&self) -> Validator {
        if self.strict_package_scope {
            Validator::strict()
        } else {
            Validator::new()
        }
    }

    /// Credentials for the token refresher: `None` when none are configured,
    /// an error when only some are.
    pub fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        let fields = [
            ("email", &self.email),
            ("name", &self.name),
            ("roll_no", &self.roll_no),
            ("access_code", &self.access_code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        if missing.len() == fields.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "Incomplete auth credentials, missing: {}",
                missing.join(", ")
            )));
        }

        let value = |field: &Option<String>| field.clone().unwrap_or_default();
        Ok(Some(Credentials {
            email: value(&self.email),
            name: value(&self.name),
            roll_no: value(&self.roll_no),
            access_code: value(&self.access_code),
            client_id: value(&self.client_id),
            client_secret: value(&self.client_secret),
        }))
    }
}
