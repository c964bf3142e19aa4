//! Delivery of log events to the ingestion endpoint.
//!
//! ```text
//! LogSubmitter::submit
//!     → domain::Validator        (reject before any I/O)
//!     → SubmissionOptions        (defaults, URL and timeout checks)
//!     → TokenProvider            (bearer token, never retried)
//!     → Transport::post + timeout, retried per RetryPolicy
//!     → normalize                (LogReceipt or SubmitError)
//! ```

pub mod client;
pub mod error;
pub mod options;
pub mod receipt;
pub mod stats;
pub mod submitter;

pub use client::{
    HttpTransport, ResponseBody, Transport, TransportConfig, TransportError, TransportResponse,
};
pub use error::SubmitError;
pub use options::{
    DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, ResolvedOptions, SubmissionOptions,
};
pub use receipt::{FALLBACK_MESSAGE, LogReceipt};
pub use stats::{StatsSnapshot, SubmissionStats};
pub use submitter::{LogSubmitter, log, normalize};
