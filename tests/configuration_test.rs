use eval_log_client::app::{Config, ConfigError, LogLevel, load_dotenv};
use serial_test::serial;
use std::io::Write;
use std::{env, time::Duration};
use tempfile::{NamedTempFile, TempDir};

// Helper function to clean all environment variables before and after tests
fn clean_all_env_vars() {
    let env_vars = [
        "LOG_API_URL",
        "MAX_RETRIES",
        "TIMEOUT_MS",
        "RETRY_CLIENT_ERRORS",
        "STRICT_PACKAGE_SCOPE",
        "LOG_LEVEL",
        "LOG_DIRECTIVES",
        "AUTH_URL",
        "AUTH_EMAIL",
        "AUTH_NAME",
        "ROLL_NO",
        "ACCESS_CODE",
        "CLIENT_ID",
        "CLIENT_SECRET",
        "CONFIG_FILE",
        "TOKEN",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn test_defaults_without_arguments() {
    clean_all_env_vars();

    let config = Config::from_args(["eval-log"]).unwrap();
    let options = config.submission_options().resolve().unwrap();

    assert_eq!(
        options.api_url.as_str(),
        "http://20.244.56.144/evaluation-service/logs"
    );
    assert_eq!(options.max_retries, 2);
    assert_eq!(options.timeout, Duration::from_millis(8000));
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.retry_policy().retry_client_errors);
    assert!(config.credentials().unwrap().is_none());
}

#[test]
#[serial]
fn test_config_from_args() {
    clean_all_env_vars();

    let config = Config::from_args([
        "eval-log",
        "--api-url",
        "http://localhost:9000/logs",
        "--max-retries",
        "5",
        "--timeout-ms",
        "1500",
        "--log-level",
        "debug",
        "frontend",
        "info",
        "component",
        "mounted",
    ])
    .unwrap();

    assert_eq!(config.api_url, "http://localhost:9000/logs");
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.timeout, Duration::from_millis(1500));
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.stack.as_deref(), Some("frontend"));
    assert_eq!(config.message.as_deref(), Some("mounted"));
}

#[test]
#[serial]
fn test_config_from_env() {
    clean_all_env_vars();

    unsafe {
        env::set_var("LOG_API_URL", "http://env-host:8080/logs");
        env::set_var("MAX_RETRIES", "0");
        env::set_var("TIMEOUT_MS", "250");
        env::set_var("RETRY_CLIENT_ERRORS", "false");
        env::set_var("STRICT_PACKAGE_SCOPE", "true");
        env::set_var("LOG_LEVEL", "error");
    }

    let config = Config::from_args(["eval-log"]);
    clean_all_env_vars();
    let config = config.unwrap();

    assert_eq!(config.api_url, "http://env-host:8080/logs");
    assert_eq!(config.max_retries, 0);
    assert_eq!(config.timeout, Duration::from_millis(250));
    assert!(!config.retry_policy().retry_client_errors);
    assert!(config.validator().is_strict());
    assert_eq!(config.log_level, LogLevel::Error);
}

#[test]
#[serial]
fn test_args_override_env() {
    clean_all_env_vars();

    unsafe {
        env::set_var("MAX_RETRIES", "7");
    }

    let config = Config::from_args(["eval-log", "--max-retries", "1"]);
    clean_all_env_vars();

    assert_eq!(config.unwrap().max_retries, 1);
}

#[test]
#[serial]
fn test_credentials_from_env() {
    clean_all_env_vars();

    unsafe {
        env::set_var("AUTH_EMAIL", "dev@example.com");
        env::set_var("AUTH_NAME", "Dev");
        env::set_var("ROLL_NO", "42");
        env::set_var("ACCESS_CODE", "abc");
        env::set_var("CLIENT_ID", "client");
        env::set_var("CLIENT_SECRET", "secret");
    }

    let config = Config::from_args(["eval-log"]);
    clean_all_env_vars();

    let credentials = config.unwrap().credentials().unwrap().unwrap();
    assert_eq!(credentials.roll_no, "42");
    assert_eq!(credentials.client_secret, "secret");
}

#[test]
#[serial]
fn test_partial_credentials_fail_validation() {
    clean_all_env_vars();

    unsafe {
        env::set_var("CLIENT_ID", "client");
    }

    let result = Config::from_args(["eval-log"]);
    clean_all_env_vars();

    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
#[serial]
fn test_config_from_file() {
    clean_all_env_vars();

    let file = write_config(
        r#"
api_url = "http://file-host/logs"
max_retries = 4
timeout_ms = 3000
log_level = "info"
strict_package_scope = true

[retry]
base_delay = 500
max_delay = 4000
max_jitter = 50
retry_client_errors = false
"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.api_url, "http://file-host/logs");
    assert_eq!(config.max_retries, 4);
    assert_eq!(config.timeout, Duration::from_millis(3000));
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validator().is_strict());

    let policy = config.retry_policy();
    assert_eq!(policy.base_delay, Duration::from_millis(500));
    assert_eq!(policy.max_delay, Duration::from_millis(4000));
    assert_eq!(policy.max_jitter, Duration::from_millis(50));
    assert!(!policy.retry_client_errors);
}

#[test]
#[serial]
fn test_config_file_merged_under_explicit_args() {
    clean_all_env_vars();

    let file = write_config(
        r#"
api_url = "http://file-host/logs"
max_retries = 4
"#,
    );

    let path = file.path().to_str().unwrap().to_string();
    let config = Config::from_args([
        "eval-log",
        "--config-file",
        path.as_str(),
        "--max-retries",
        "1",
    ])
    .unwrap();

    assert_eq!(config.api_url, "http://file-host/logs");
    assert_eq!(config.max_retries, 1);
}

#[test]
#[serial]
fn test_explicit_default_value_beats_config_file() {
    clean_all_env_vars();

    let file = write_config("max_retries = 5\ntimeout_ms = 3000\n");
    let path = file.path().to_str().unwrap().to_string();

    let config = Config::from_args([
        "eval-log",
        "--config-file",
        path.as_str(),
        "--max-retries",
        "2",
    ])
    .unwrap();

    assert_eq!(config.max_retries, 2);
    assert_eq!(config.timeout, Duration::from_millis(3000));

    unsafe {
        env::set_var("TIMEOUT_MS", "8000");
    }
    let config = Config::from_args(["eval-log", "--config-file", path.as_str()]);
    clean_all_env_vars();

    let config = config.unwrap();
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.timeout, Duration::from_millis(8000));
}

#[test]
#[serial]
fn test_log_directives_from_file_and_env() {
    clean_all_env_vars();

    let file = write_config("log_directives = [\"reqwest=info\"]\n");
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.log_directives, ["reqwest=info"]);

    unsafe {
        env::set_var("LOG_DIRECTIVES", "hyper=debug,h2=error");
    }
    let config = Config::from_args(["eval-log"]);
    clean_all_env_vars();

    assert_eq!(config.unwrap().log_directives, ["hyper=debug", "h2=error"]);
}

#[test]
#[serial]
fn test_dotenv_file_feeds_token_and_config() {
    clean_all_env_vars();

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "TOKEN=from-dotenv\nLOG_API_URL=http://dotenv-host/logs\nMAX_RETRIES=4\n",
    )
    .unwrap();

    unsafe {
        env::set_var("MAX_RETRIES", "1");
    }

    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let loaded = load_dotenv();
    env::set_current_dir(original_dir).unwrap();

    let token = env::var("TOKEN");
    let config = Config::from_args(["eval-log"]);
    clean_all_env_vars();

    assert!(loaded.is_some());
    assert_eq!(token.as_deref(), Ok("from-dotenv"));

    let config = config.unwrap();
    assert_eq!(config.api_url, "http://dotenv-host/logs");
    // Variables already in the environment are not overridden
    assert_eq!(config.max_retries, 1);
}

#[test]
#[serial]
fn test_config_file_from_env_var() {
    clean_all_env_vars();

    let file = write_config("timeout_ms = 1200\n");
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = Config::from_args(["eval-log"]);
    clean_all_env_vars();

    assert_eq!(config.unwrap().timeout, Duration::from_millis(1200));
}

#[test]
#[serial]
fn test_invalid_config_values() {
    clean_all_env_vars();

    let bad_url = Config::from_args(["eval-log", "--api-url", "not a url"]);
    assert!(matches!(bad_url, Err(ConfigError::InvalidUrl(_))));

    let bad_level = Config::from_args(["eval-log", "--log-level", "loud"]);
    assert!(matches!(bad_level, Err(ConfigError::Cli(_))));

    let inverted = write_config(
        r#"
[retry]
base_delay = 5000
max_delay = 1000
"#,
    );
    assert!(matches!(
        Config::from_file(inverted.path()),
        Err(ConfigError::InvalidConfig(_))
    ));

    let malformed = write_config("max_retries = \"many\"\n");
    assert!(matches!(
        Config::from_file(malformed.path()),
        Err(ConfigError::ParseError(_))
    ));

    assert!(matches!(
        Config::from_file("/nonexistent/eval-log.toml"),
        Err(ConfigError::FileError(_))
    ));
}
