//! Task priority. Lower numeric value = more urgent.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::QueueError;

/// Integer priority in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(1);
    pub const DEFAULT: Priority = Priority(3);
    pub const LOWEST: Priority = Priority(5);

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<i64> for Priority {
    type Error = QueueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::HIGHEST.0)..=i64::from(Self::LOWEST.0)).contains(&value) {
            Ok(Priority(value as u8))
        } else {
            Err(QueueError::InvalidPriority(value.to_string()))
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = QueueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

/// JSON numbers may be fractional (`2.5`) or out of range; both are rejected.
impl TryFrom<&serde_json::Number> for Priority {
    type Error = QueueError;

    fn try_from(value: &serde_json::Number) -> Result<Self, Self::Error> {
        match value.as_i64() {
            Some(n) => Self::try_from(n),
            None => Err(QueueError::InvalidPriority(value.to_string())),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}
