//! Retry behaviour for log submission.
//!
//! - `retry.rs`: backoff schedule with jitter
//! - `attempt.rs`: per-submission attempt state machine

pub mod attempt;
pub mod retry;

pub use attempt::{AttemptState, Transition};
pub use retry::RetryPolicy;
