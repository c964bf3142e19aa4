//! Domain layer for eval-log-client.
//!
//! Contains the closed vocabularies and the validator:
//! - `LogEvent`: the validated event that becomes the request body
//! - `Stack` / `Level` / `Package`: closed enumerations with lowercase wire names
//! - `ValidationError`: per-field rejection raised before any network action

pub mod error;
pub mod log_event;
pub mod log_level;
pub mod package;
pub mod stack;
pub mod validation;

pub use error::{Field, ValidationError};
pub use log_event::LogEvent;
pub use log_level::Level;
pub use package::{Package, PackageScope};
pub use stack::Stack;
pub use validation::{Validator, validate, validate_value};
