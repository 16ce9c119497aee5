//! Request credentials

use crate::error::{AuthError, AuthResult};
use std::fmt;

const BEARER_SCHEME: &str = "bearer";

/// What a request presented to prove who it is
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    Bearer(String),
}

impl Credentials {
    /// Parse an `Authorization` header value. An absent header is anonymous;
    /// anything other than a non-empty bearer token is rejected.
    pub fn from_authorization(header: Option<&str>) -> AuthResult<Self> {
        let Some(header) = header else {
            return Ok(Credentials::Anonymous);
        };

        let (scheme, token) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| AuthError::invalid_credentials("malformed authorization header"))?;

        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(AuthError::invalid_credentials(format!(
                "unsupported authorization scheme '{}'",
                scheme
            )));
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::invalid_credentials("empty bearer token"));
        }
        Ok(Credentials::Bearer(token.to_string()))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credentials::Bearer(token) => Some(token),
            Credentials::Anonymous => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}
