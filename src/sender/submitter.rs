use super::client::{HttpTransport, ResponseBody, Transport, TransportConfig, TransportResponse};
use super::options::{ResolvedOptions, SubmissionOptions};
use super::receipt::LogReceipt;
use super::stats::{StatsSnapshot, SubmissionStats};
use super::SubmitError;
use crate::auth::{AuthError, EnvToken, TokenProvider};
use crate::domain::{LogEvent, Validator};
use crate::reliability::{AttemptState, RetryPolicy, Transition};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Validates, authenticates and delivers single log events.
///
/// Each call owns its own attempt state; clones share the HTTP connection
/// pool, the token provider and the statistics counters.
pub struct LogSubmitter<P, T = HttpTransport> {
    provider: Arc<P>,
    transport: Arc<T>,
    policy: RetryPolicy,
    validator: Validator,
    stats: Arc<SubmissionStats>,
}

impl<P, T> Clone for LogSubmitter<P, T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            transport: Arc::clone(&self.transport),
            policy: self.policy.clone(),
            validator: self.validator,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<P: TokenProvider> LogSubmitter<P, HttpTransport> {
    pub fn new(provider: P) -> Result<Self, SubmitError> {
        let transport = HttpTransport::new(TransportConfig::default())?;
        Ok(Self::with_transport(provider, transport))
    }
}

impl<P: TokenProvider, T: Transport> LogSubmitter<P, T> {
    pub fn with_transport(provider: P, transport: T) -> Self {
        Self {
            provider: Arc::new(provider),
            transport: Arc::new(transport),
            policy: RetryPolicy::default(),
            validator: Validator::default(),
            stats: Arc::new(SubmissionStats::new()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn submit(
        &self,
        stack: &str,
        level: &str,
        package: &str,
        message: &str,
        options: &SubmissionOptions,
    ) -> Result<LogReceipt, SubmitError> {
        let event = self.validator.validate(stack, level, package, message)?;
        self.run(&event, options, None).await
    }

    /// Submits an untyped JSON object; non-string fields are rejected.
    pub async fn submit_value(
        &self,
        value: &Value,
        options: &SubmissionOptions,
    ) -> Result<LogReceipt, SubmitError> {
        let event = self.validator.validate_value(value)?;
        self.run(&event, options, None).await
    }

    pub async fn submit_event(
        &self,
        event: &LogEvent,
        options: &SubmissionOptions,
    ) -> Result<LogReceipt, SubmitError> {
        self.run(event, options, None).await
    }

    /// Like [`submit_event`](Self::submit_event), ending early with
    /// [`SubmitError::Cancelled`] once `cancel` fires.
    pub async fn submit_event_with_cancel(
        &self,
        event: &LogEvent,
        options: &SubmissionOptions,
        cancel: &CancellationToken,
    ) -> Result<LogReceipt, SubmitError> {
        self.run(event, options, Some(cancel)).await
    }

    async fn run(
        &self,
        event: &LogEvent,
        options: &SubmissionOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<LogReceipt, SubmitError> {
        self.validator.check_scope(event)?;
        let resolved = options.resolve()?;
        let token = self.resolve_token().await?;

        let request_id = Uuid::new_v4().to_string();
        let headers = build_headers(&token, &request_id)?;
        let body = Bytes::from(serde_json::to_vec(event)?);

        self.stats.record_submission();
        let result = self
            .attempt_loop(&resolved, &headers, body, &request_id, cancel)
            .await;

        match &result {
            Ok(receipt) => self.stats.record_success(receipt.is_fallback()),
            Err(e) => {
                self.stats.record_failure();
                error!(
                    "Log submission {} to {} failed: {}",
                    request_id, resolved.api_url, e
                );
            }
        }

        result
    }

    async fn resolve_token(&self) -> Result<String, SubmitError> {
        let token = self.provider.bearer_token().await?;
        if token.trim().is_empty() {
            return Err(AuthError::Empty.into());
        }
        Ok(token)
    }

    async fn attempt_loop(
        &self,
        resolved: &ResolvedOptions,
        headers: &HeaderMap,
        body: Bytes,
        request_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<LogReceipt, SubmitError> {
        let total_attempts = resolved.max_retries.saturating_add(1);
        let mut state = AttemptState::new(resolved.max_retries);

        while !state.is_exhausted() {
            let attempt = state.attempt() + 1;
            self.stats.record_attempt();
            debug!(
                "Sending log event {} (attempt {}/{})",
                request_id, attempt, total_attempts
            );

            let error = match self
                .dispatch(resolved, headers.clone(), body.clone(), cancel)
                .await
            {
                Ok(receipt) => {
                    info!(
                        "Log event {} accepted on attempt {}",
                        request_id, attempt
                    );
                    return Ok(receipt);
                }
                Err(e) => e,
            };

            if matches!(error, SubmitError::Timeout(_)) {
                self.stats.record_timeout();
            }

            match state.fail(error, &self.policy) {
                Transition::Retry { next, delay } => {
                    if let Some(e) = next.last_error() {
                        warn!(
                            "Attempt {} for log event {} failed: {}; retrying in {:?}",
                            attempt, request_id, e, delay
                        );
                    }
                    self.stats.record_retry();
                    pause(delay, cancel).await?;
                    state = next;
                }
                Transition::GiveUp(e) => return Err(e),
            }
        }

        Err(state.into_error())
    }

    async fn dispatch(
        &self,
        resolved: &ResolvedOptions,
        headers: HeaderMap,
        body: Bytes,
        cancel: Option<&CancellationToken>,
    ) -> Result<LogReceipt, SubmitError> {
        let exchange = tokio::time::timeout(
            resolved.timeout,
            self.transport.post(&resolved.api_url, headers, body),
        );

        let response = until_cancelled(exchange, cancel)
            .await?
            .map_err(|_| SubmitError::Timeout(resolved.timeout))??;

        let status = response.status();
        let body = if wants_body(status) {
            read_body(response, resolved.timeout, cancel).await?
        } else {
            Bytes::new()
        };

        normalize(TransportResponse::new(status, body))
    }
}

/// Only accepted (receipt) and client-error (reason) bodies are read.
fn wants_body(status: u16) -> bool {
    (200..300).contains(&status) || (400..500).contains(&status)
}

/// Reads the body of a response whose status is already known. The request
/// has been delivered at this point, so a failed or stalled read yields an
/// empty body instead of an error that would trigger another POST.
async fn read_body<R: ResponseBody>(
    response: R,
    wait: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<Bytes, SubmitError> {
    let status = response.status();
    let read = tokio::time::timeout(wait, response.read_body());

    match until_cancelled(read, cancel).await? {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => {
            debug!("Discarding unreadable {} response body: {}", status, e);
            Ok(Bytes::new())
        }
        Err(_) => {
            debug!(
                "Discarding {} response body not received within {:?}",
                status, wait
            );
            Ok(Bytes::new())
        }
    }
}

/// Maps a raw response onto the receipt or error taxonomy.
pub fn normalize(response: TransportResponse) -> Result<LogReceipt, SubmitError> {
    if response.is_success() {
        return Ok(LogReceipt::from_body(&response.body));
    }

    if response.is_client_error() {
        return Err(SubmitError::ClientError {
            status: response.status,
            body: response.body_text(),
        });
    }

    Err(SubmitError::ServerError {
        status: response.status,
    })
}

fn build_headers(token: &str, request_id: &str) -> Result<HeaderMap, SubmitError> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| SubmitError::MissingCredential(AuthError::InvalidToken))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(request_id)
            .map_err(|e| SubmitError::InvalidOptions(format!("Invalid request id: {e}")))?,
    );

    Ok(headers)
}

async fn pause(delay: Duration, cancel: Option<&CancellationToken>) -> Result<(), SubmitError> {
    until_cancelled(tokio::time::sleep(delay), cancel).await
}

async fn until_cancelled<F: Future>(
    future: F,
    cancel: Option<&CancellationToken>,
) -> Result<F::Output, SubmitError> {
    match cancel {
        Some(cancel) => tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}

/// One-shot submission with the token taken from the environment
/// (`TOKEN`, `LOGGER_AUTH_TOKEN` or `AUTH_TOKEN`).
pub async fn log(
    stack: &str,
    level: &str,
    package: &str,
    message: &str,
    options: &SubmissionOptions,
) -> Result<LogReceipt, SubmitError> {
    LogSubmitter::new(EnvToken::default())?
        .submit(stack, level, package, message, options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::sender::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Answers every request with the same status and body.
    struct FixedTransport {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for FixedTransport {
        type Response = TransportResponse;

        async fn post(
            &self,
            _url: &Url,
            _headers: HeaderMap,
            _body: Bytes,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransportResponse::new(self.status, self.body))
        }
    }

    #[test]
    fn test_normalize() {
        let receipt = normalize(TransportResponse::new(201, r#"{"message":"ok"}"#)).unwrap();
        assert_eq!(receipt.message(), Some("ok"));

        let receipt = normalize(TransportResponse::new(200, "")).unwrap();
        assert!(receipt.is_fallback());

        match normalize(TransportResponse::new(422, "bad level")) {
            Err(SubmitError::ClientError { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad level");
            }
            other => panic!("expected client error, got {other:?}"),
        }

        assert!(matches!(
            normalize(TransportResponse::new(503, "down")),
            Err(SubmitError::ServerError { status: 503 })
        ));
        assert!(matches!(
            normalize(TransportResponse::new(304, "")),
            Err(SubmitError::ServerError { status: 304 })
        ));
    }

    #[test]
    fn test_headers() {
        let headers = build_headers("abc", "req-1").unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[REQUEST_ID_HEADER], "req-1");
    }

    #[test]
    fn test_header_rejects_control_characters() {
        assert!(matches!(
            build_headers("bad\ntoken", "req-1"),
            Err(SubmitError::MissingCredential(AuthError::InvalidToken))
        ));
    }

    #[tokio::test]
    async fn test_submit_success_updates_stats() {
        let submitter = LogSubmitter::with_transport(
            StaticToken::new("t"),
            FixedTransport::new(201, r#"{"logID":"x","message":"log created successfully"}"#),
        );

        let receipt = submitter
            .submit("backend", "info", "db", "connected", &SubmissionOptions::new())
            .await
            .unwrap();

        assert_eq!(receipt.log_id(), Some("x"));
        let stats = submitter.stats();
        assert_eq!(stats.submissions, 1);
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.retries, 0);
    }

    #[tokio::test]
    async fn test_blank_token_is_missing_credential() {
        let transport = FixedTransport::new(201, "{}");
        let submitter = LogSubmitter::with_transport(StaticToken::new("   "), transport);

        let err = submitter
            .submit("backend", "info", "db", "m", &SubmissionOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::MissingCredential(AuthError::Empty)));
        assert_eq!(submitter.transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(submitter.stats().submissions, 0);
    }

    #[tokio::test]
    async fn test_token_forwarded_verbatim() {
        assert_eq!(
            LogSubmitter::with_transport(StaticToken::new(" padded "), FixedTransport::new(201, "{}"))
                .resolve_token()
                .await
                .unwrap(),
            " padded "
        );
    }

    #[tokio::test]
    async fn test_strict_validator_applies_to_typed_events() {
        use crate::domain::{Level, Package, Stack};

        let submitter = LogSubmitter::with_transport(
            StaticToken::new("t"),
            FixedTransport::new(201, "{}"),
        )
        .with_validator(Validator::strict());

        let event = LogEvent::new(Stack::Frontend, Level::Info, Package::Repository, "m");
        let err = submitter
            .submit_event(&event, &SubmissionOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::InvalidField(_)));
        assert_eq!(submitter.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clones_share_stats() {
        let submitter = LogSubmitter::with_transport(
            StaticToken::new("t"),
            FixedTransport::new(200, "{}"),
        );
        let clone = submitter.clone();

        clone
            .submit("frontend", "debug", "hook", "m", &SubmissionOptions::new())
            .await
            .unwrap();

        assert_eq!(submitter.stats().successes, 1);
    }
}
