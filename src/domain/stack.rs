use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the application emitted the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stack {
    Backend,
    Frontend,
}

impl Stack {
    pub const ALL: [Stack; 2] = [Stack::Backend, Stack::Frontend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stack::Backend => "backend",
            Stack::Frontend => "frontend",
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stack {
    type Err = ();

    /// Exact, case-sensitive match against the lowercase wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stack::ALL
            .into_iter()
            .find(|stack| stack.as_str() == s)
            .ok_or(())
    }
}
