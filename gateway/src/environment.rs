//! Process mode resolution.
//!
//! The gateway runs in exactly one of three modes, read once at startup from `GATEWAY_ENV`
//! (or `--env`). Behavior that differs between modes (the GraphQL auth gate, the query explorer,
//! introspection, the JWT secret fallback) asks the [`Environment`] rather than reading the
//! process environment again.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Name of the environment variable holding the process mode.
pub const ENVIRONMENT_VARIABLE: &str = "GATEWAY_ENV";

/// A recognized process mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Testing,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Testing => "testing",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value is not one of `development`, `testing` or `production`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Mode::Development),
            "testing" => Ok(Mode::Testing),
            "production" => Ok(Mode::Production),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// The resolved process mode, remembering the raw value it was derived from.
///
/// An unrecognized value does not fail resolution: it is kept so that startup can report it
/// once the listening port is bound, see [`Environment::is_not_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
    mode: Option<Mode>,
}

impl Environment {
    /// Resolve the mode from a raw setting.
    pub fn resolve(name: impl Into<String>) -> Self {
        let name = name.into();
        let mode = name.parse().ok();
        Self { name, mode }
    }

    /// Resolve the mode from `GATEWAY_ENV`, defaulting to `development` when unset.
    pub fn from_process() -> Self {
        Self::resolve(
            std::env::var(ENVIRONMENT_VARIABLE)
                .unwrap_or_else(|_| Mode::Development.as_str().to_string()),
        )
    }

    /// The raw value this environment was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn is_production(&self) -> bool {
        self.mode == Some(Mode::Production)
    }

    /// True for `development`, `testing`, and unrecognized values.
    pub fn is_not_production(&self) -> bool {
        !self.is_production()
    }

    pub fn is_not_valid(&self) -> bool {
        self.mode.is_none()
    }
}

impl From<Mode> for Environment {
    fn from(mode: Mode) -> Self {
        Self {
            name: mode.as_str().to_string(),
            mode: Some(mode),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
