//! Tracing setup for the `eval-log` binary.
//!
//! Diagnostics go to stderr so stdout carries only the receipt. The library
//! itself never installs a subscriber.

use super::config::LogLevel;
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Noisy dependencies held at `warn` unless overridden.
const DEFAULT_DIRECTIVES: &[(&str, LogLevel)] = &[
    ("hyper", LogLevel::Warn),
    ("hyper_util", LogLevel::Warn),
    ("reqwest", LogLevel::Warn),
    ("h2", LogLevel::Warn),
];

#[derive(Error, Debug)]
pub enum LoggingInitError {
    #[error("Invalid directive '{input}'. Expected: 'target=level'")]
    InvalidDirective { input: String },

    #[error("Logging system initialization failed: {details}")]
    InitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Logging system initialization failed earlier in this process")]
    AlreadyFailed,
}

impl FromStr for LogLevel {
    type Err = LoggingInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingInitError::InvalidDirective {
                input: s.to_string(),
            }),
        }
    }
}

/// Per-target level override, `target=level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(input: &str) -> Result<Self, LoggingInitError> {
        let invalid = || LoggingInitError::InvalidDirective {
            input: input.to_string(),
        };

        let (target, level) = input.split_once('=').ok_or_else(invalid)?;
        let target = target.trim();
        if target.is_empty() {
            return Err(invalid());
        }

        let level = level.trim().parse::<LogLevel>().map_err(|_| invalid())?;
        Ok(Self::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
        }
    }

    pub fn with_default_directives() -> Self {
        let system = Self::new();
        system.directives.write().extend(
            DEFAULT_DIRECTIVES
                .iter()
                .map(|(target, level)| LogDirective::new(*target, *level)),
        );
        system
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), LoggingInitError> {
        let directive = LogDirective::parse(directive_str)?;
        self.directives.write().push(directive);
        Ok(())
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    /// Installs the global subscriber. `RUST_LOG`, when set, replaces the
    /// generated filter.
    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), LoggingInitError> {
        let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(raw) if !raw.trim().is_empty() => EnvFilter::try_new(&raw),
            _ => EnvFilter::try_new(self.build_filter_string(default_level)),
        }
        .map_err(|e| LoggingInitError::InitFailed {
            details: "Failed to build EnvFilter".to_string(),
            source: Box::new(e),
        })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            LoggingInitError::InitFailed {
                details: "Failed to set global tracing subscriber".to_string(),
                source: Box::new(e),
            }
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs logging once per process; later calls report the first outcome.
/// `directives` are `target=level` overrides layered over the defaults.
pub fn setup_logging(level: LogLevel, directives: &[String]) -> Result<(), LoggingInitError> {
    static INIT: OnceLock<bool> = OnceLock::new();

    let system = LoggingSystem::with_default_directives();
    for directive in directives {
        system.add_directive(directive)?;
    }

    let initialized = *INIT.get_or_init(|| {
        system
            .initialize_tracing(level)
            .map_err(|e| eprintln!("Warning: {e}"))
            .is_ok()
    });

    if initialized {
        Ok(())
    } else {
        Err(LoggingInitError::AlreadyFailed)
    }
}
