//! Retry state for a single submission.
//!
//! ```text
//! AttemptState{attempt: 0}
//!     → dispatch succeeds            → caller returns the receipt
//!     → dispatch fails, retryable    → Transition::Retry{attempt + 1, delay}
//!     → dispatch fails, final        → Transition::GiveUp(error)
//! ```
//!
//! Transitions consume the state, so a stale attempt counter cannot be reused.

use super::retry::RetryPolicy;
use crate::sender::SubmitError;
use std::time::Duration;

#[derive(Debug)]
pub struct AttemptState {
    attempt: u32,
    max_retries: u32,
    last_error: Option<SubmitError>,
}

#[derive(Debug)]
pub enum Transition {
    Retry { next: AttemptState, delay: Duration },
    GiveUp(SubmitError),
}

impl AttemptState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
            last_error: None,
        }
    }

    /// Zero-based index of the attempt about to run.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn last_error(&self) -> Option<&SubmitError> {
        self.last_error.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt > self.max_retries
    }

    pub fn fail(self, error: SubmitError, policy: &RetryPolicy) -> Transition {
        if !error.is_retryable(policy) {
            return Transition::GiveUp(error);
        }

        let next_attempt = self.attempt + 1;
        if next_attempt > self.max_retries {
            return Transition::GiveUp(error);
        }

        Transition::Retry {
            delay: policy.delay_for(next_attempt),
            next: AttemptState {
                attempt: next_attempt,
                max_retries: self.max_retries,
                last_error: Some(error),
            },
        }
    }

    /// Error to surface when the loop ends without a verdict.
    pub fn into_error(self) -> SubmitError {
        self.last_error
            .unwrap_or(SubmitError::UnknownSubmissionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;

    fn server_error() -> SubmitError {
        SubmitError::ServerError { status: 503 }
    }

    #[test]
    fn test_retry_then_give_up() {
        let policy = RetryPolicy::immediate();
        let state = AttemptState::new(2);
        assert_eq!(state.attempt(), 0);

        let Transition::Retry { next, delay } = state.fail(server_error(), &policy) else {
            panic!("expected retry after first failure");
        };
        assert_eq!(next.attempt(), 1);
        assert_eq!(delay, Duration::ZERO);
        assert!(matches!(
            next.last_error(),
            Some(SubmitError::ServerError { status: 503 })
        ));

        let Transition::Retry { next, .. } = next.fail(server_error(), &policy) else {
            panic!("expected retry after second failure");
        };
        assert_eq!(next.attempt(), 2);

        match next.fail(SubmitError::Timeout(Duration::from_secs(8)), &policy) {
            Transition::GiveUp(SubmitError::Timeout(_)) => {}
            other => panic!("expected final timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_retries_gives_up_immediately() {
        let policy = RetryPolicy::immediate();
        let state = AttemptState::new(0);
        assert!(matches!(
            state.fail(server_error(), &policy),
            Transition::GiveUp(SubmitError::ServerError { .. })
        ));
    }

    #[test]
    fn test_delay_follows_policy() {
        let policy = RetryPolicy::default();
        let Transition::Retry { delay, .. } = AttemptState::new(3).fail(server_error(), &policy)
        else {
            panic!("expected retry");
        };
        assert!(delay >= Duration::from_millis(2000));
        assert!(delay < Duration::from_millis(2200));
    }

    #[test]
    fn test_fatal_errors_skip_retry() {
        let policy = RetryPolicy::immediate();
        let state = AttemptState::new(5);
        assert!(matches!(
            state.fail(SubmitError::MissingCredential(AuthError::NotFound), &policy),
            Transition::GiveUp(SubmitError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_client_errors_follow_policy_switch() {
        let client_error = || SubmitError::ClientError {
            status: 400,
            body: "bad".to_string(),
        };

        let retrying = RetryPolicy::immediate();
        assert!(matches!(
            AttemptState::new(1).fail(client_error(), &retrying),
            Transition::Retry { .. }
        ));

        let strict = RetryPolicy::immediate().with_retry_client_errors(false);
        assert!(matches!(
            AttemptState::new(1).fail(client_error(), &strict),
            Transition::GiveUp(SubmitError::ClientError { status: 400, .. })
        ));
    }

    #[test]
    fn test_into_error_without_failures() {
        let state = AttemptState::new(2);
        assert!(matches!(
            state.into_error(),
            SubmitError::UnknownSubmissionError
        ));
    }
}
