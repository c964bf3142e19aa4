#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_possible_wrap,       // Safe in non-negative contexts
    clippy::cast_precision_loss,      // Acceptable for stats/display
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SubmitError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod auth;
pub mod domain;
pub mod reliability;
pub mod sender;

pub use app::{App, Config};
pub use auth::{AuthError, EnvToken, StaticToken, TokenProvider, TokenRefresher};
pub use domain::{Level, LogEvent, Package, Stack, ValidationError, Validator, validate};
pub use reliability::RetryPolicy;
pub use sender::{LogReceipt, LogSubmitter, SubmissionOptions, SubmitError, log};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
