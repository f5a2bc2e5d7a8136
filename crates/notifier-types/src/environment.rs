//! Process-wide storage mode flag.
//!
//! `test` runs against an in-memory SQLite database that lives as long as
//! the process; `production` connects to the configured database URL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which storage backend the process runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// In-memory storage, discarded on exit.
    Test,
    /// The configured relational database.
    #[default]
    Production,
}

impl Environment {
    /// Whether this is the in-memory test mode.
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }

    /// The lowercase name used in configuration and environment variables.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an environment name is neither `test` nor `production`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEnvironment(pub String);

impl fmt::Display for UnknownEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown environment `{}`", self.0)
    }
}

impl std::error::Error for UnknownEnvironment {}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(UnknownEnvironment(other.to_owned())),
        }
    }
}
