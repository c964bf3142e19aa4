use super::{Level, Package, Stack};
use serde::{Deserialize, Serialize};

/// A single validated log event, serialized as the request body.
///
/// Field order matches the wire object:
/// `{"stack": .., "level": .., "package": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub stack: Stack,
    pub level: Level,
    pub package: Package,
    pub message: String,
}

impl LogEvent {
    pub fn new(stack: Stack, level: Level, package: Package, message: impl Into<String>) -> Self {
        Self {
            stack,
            level,
            package,
            message: message.into(),
        }
    }
}
