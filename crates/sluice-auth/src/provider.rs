//! Identity providers

use crate::context::{AuthContext, Identity};
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves request credentials to an identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, credentials: &Credentials) -> AuthResult<Identity>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Answers every request with the same identity, credentials or not.
///
/// Defaults to account 1, user 1 with every permission. Meant for local
/// development only.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Identity,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new(Identity::new(AuthContext::DEVELOPMENT).grant("*"))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn identify(&self, _credentials: &Credentials) -> AuthResult<Identity> {
        Ok(self.identity.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Looks bearer tokens up in a fixed table
#[derive(Debug, Clone, Default)]
pub struct TokenIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl TokenIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn identify(&self, credentials: &Credentials) -> AuthResult<Identity> {
        let token = credentials
            .bearer_token()
            .ok_or(AuthError::MissingCredentials)?;
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::invalid_credentials("unknown bearer token"))
    }

    fn name(&self) -> &'static str {
        "token"
    }
}
