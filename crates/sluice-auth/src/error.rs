//! Authorization error types

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was presented
    #[error("Authentication required")]
    MissingCredentials,

    /// A credential was presented but not recognized
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// The identity lacks the permission the operation requires
    #[error("Access denied: {permission} on {resource}")]
    AccessDenied { resource: String, permission: String },

    /// An identity provider produced an unusable context
    #[error("Invalid authorization context: {message}")]
    InvalidContext { message: String },

    /// The identity provider itself failed
    #[error("Identity provider error: {message}")]
    Provider { message: String },
}

impl AuthError {
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials { message: message.into() }
    }

    pub fn access_denied(resource: impl Into<String>, permission: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
            permission: permission.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "MISSING_CREDENTIALS",
            AuthError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            AuthError::AccessDenied { .. } => "ACCESS_DENIED",
            AuthError::InvalidContext { .. } => "INVALID_AUTH_CONTEXT",
            AuthError::Provider { .. } => "AUTHENTICATION_ERROR",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidCredentials { .. } => 401,
            AuthError::AccessDenied { .. } => 403,
            AuthError::InvalidContext { .. } | AuthError::Provider { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingCredentials.status_code(), 401);
        assert_eq!(AuthError::invalid_credentials("unknown token").status_code(), 401);
        assert_eq!(AuthError::access_denied("orders", "write").status_code(), 403);
        assert_eq!(AuthError::provider("down").status_code(), 500);
    }

    #[test]
    fn test_access_denied_message() {
        let error = AuthError::access_denied("orders", "write");
        assert_eq!(error.to_string(), "Access denied: write on orders");
        assert_eq!(error.error_code(), "ACCESS_DENIED");
    }
}
