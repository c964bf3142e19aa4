use super::error::{Field, ValidationError};
use super::{Level, LogEvent, Package, Stack};
use serde_json::Value;
use std::str::FromStr;

/// Checks raw fields against the closed vocabularies.
///
/// The default validator accepts any package on any stack. `strict()` also
/// rejects backend-only packages on the frontend stack and vice versa.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    strict_scope: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict_scope: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict_scope
    }

    pub fn validate(
        &self,
        stack: &str,
        level: &str,
        package: &str,
        message: &str,
    ) -> Result<LogEvent, ValidationError> {
        let event = validate(stack, level, package, message)?;
        self.check_scope(&event)?;
        Ok(event)
    }

    pub fn validate_value(&self, value: &Value) -> Result<LogEvent, ValidationError> {
        let event = validate_value(value)?;
        self.check_scope(&event)?;
        Ok(event)
    }

    pub fn check_scope(&self, event: &LogEvent) -> Result<(), ValidationError> {
        if self.strict_scope && !event.package.is_allowed_in(event.stack) {
            return Err(ValidationError::ScopeMismatch {
                stack: event.stack,
                package: event.package,
            });
        }
        Ok(())
    }
}

/// Validates the four fields in order, reporting the first offender.
pub fn validate(
    stack: &str,
    level: &str,
    package: &str,
    message: &str,
) -> Result<LogEvent, ValidationError> {
    let stack = parse_field(Field::Stack, Some(stack), &Stack::ALL.map(|s| s.as_str()))?;
    let level = parse_field(Field::Level, Some(level), &Level::ALL.map(|l| l.as_str()))?;
    let package = parse_field(
        Field::Package,
        Some(package),
        &Package::ALL.map(|p| p.as_str()),
    )?;

    Ok(LogEvent::new(stack, level, package, message))
}

/// Same checks as [`validate`], for an untyped JSON object where any field may
/// be missing or of the wrong type.
pub fn validate_value(value: &Value) -> Result<LogEvent, ValidationError> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);

    let stack = parse_field(Field::Stack, field("stack"), &Stack::ALL.map(|s| s.as_str()))?;
    let level = parse_field(Field::Level, field("level"), &Level::ALL.map(|l| l.as_str()))?;
    let package = parse_field(
        Field::Package,
        field("package"),
        &Package::ALL.map(|p| p.as_str()),
    )?;
    let Some(message) = field("message") else {
        return Err(ValidationError::MessageNotString);
    };

    Ok(LogEvent::new(stack, level, package, message))
}

fn parse_field<T: FromStr>(
    field: Field,
    raw: Option<&str>,
    allowed: &[&str],
) -> Result<T, ValidationError> {
    let not_in_set = || ValidationError::NotInSet {
        field,
        allowed: allowed.join(", "),
    };

    let raw = raw.ok_or_else(not_in_set)?;
    if raw != raw.to_lowercase() {
        return Err(not_in_set());
    }
    raw.parse::<T>().map_err(|_| not_in_set())
}
