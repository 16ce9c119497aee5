use thiserror::Error;

/// Why the configuration could not be loaded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable with no usable default is unset
    #[error("{var} must be set: {hint}")]
    MissingVariable { var: String, hint: String },

    /// A variable is set but does not parse or is out of range
    #[error("{var}='{value}' is invalid, expected {expected}")]
    InvalidVariable {
        var: String,
        value: String,
        expected: String,
    },

    /// Individually valid settings that contradict each other
    #[error("Inconsistent configuration: {message}")]
    Inconsistent { message: String },
}

impl ConfigError {
    pub fn missing(var: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingVariable {
            var: var.into(),
            hint: hint.into(),
        }
    }

    pub fn invalid(var: impl Into<String>, value: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidVariable {
            var: var.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }

    /// The environment variable at fault, if there is a single one
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::MissingVariable { var, .. } | Self::InvalidVariable { var, .. } => Some(var),
            Self::Inconsistent { .. } => None,
        }
    }
}
