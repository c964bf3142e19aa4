use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Acknowledgement returned when the service accepts a 2xx body we cannot read.
pub const FALLBACK_MESSAGE: &str = "log created (no body)";

/// Normalized success response.
///
/// The service answers with a JSON object, typically
/// `{"logID": "...", "message": "log created successfully"}`. Its shape is not
/// fixed, so the object is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogReceipt {
    body: Map<String, Value>,
}

impl LogReceipt {
    /// Parses a success body, falling back to the sentinel acknowledgement.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Map<String, Value>>(body) {
            Ok(body) => Self { body },
            Err(_) => Self::fallback(),
        }
    }

    pub fn fallback() -> Self {
        let mut body = Map::new();
        body.insert(
            "message".to_string(),
            Value::String(FALLBACK_MESSAGE.to_string()),
        );
        Self { body }
    }

    pub fn is_fallback(&self) -> bool {
        self.body.len() == 1 && self.message() == Some(FALLBACK_MESSAGE)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    pub fn log_id(&self) -> Option<&str> {
        self.body.get("logID").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}
