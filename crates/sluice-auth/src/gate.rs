//! Permission enforcement

use crate::context::{AuthContext, SecurityRequirement};
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::provider::IdentityProvider;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolves credentials through an [`IdentityProvider`] and checks a
/// [`SecurityRequirement`] against the granted permissions.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn IdentityProvider>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Authorize a request. Without a requirement any resolved identity passes.
    pub async fn authorize(
        &self,
        credentials: &Credentials,
        requirement: Option<&SecurityRequirement>,
    ) -> AuthResult<AuthContext> {
        let identity = self.provider.identify(credentials).await?;

        if let Some(requirement) = requirement {
            if !identity.grants(requirement) {
                debug!(
                    account_id = identity.context.account_id(),
                    user_id = identity.context.user_id(),
                    "Permission {} denied",
                    requirement
                );
                return Err(AuthError::access_denied(
                    requirement.resource.clone(),
                    requirement.permission.clone(),
                ));
            }
        }

        Ok(identity.context)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Identity;
    use crate::provider::TokenIdentityProvider;

    fn gate() -> PermissionGate {
        let provider = TokenIdentityProvider::new()
            .with_token("reader", Identity::new(AuthContext::new(2, 5).unwrap()).grant("orders:read"));
        PermissionGate::new(Arc::new(provider))
    }

    fn reader() -> Credentials {
        Credentials::Bearer("reader".to_string())
    }

    #[tokio::test]
    async fn test_granted_requirement_yields_context() {
        let context = gate()
            .authorize(&reader(), Some(&SecurityRequirement::new("orders", "read")))
            .await
            .unwrap();
        assert_eq!(context.account_id(), 2);
        assert_eq!(context.user_id(), 5);
    }

    #[tokio::test]
    async fn test_missing_permission_is_denied() {
        let err = gate()
            .authorize(&reader(), Some(&SecurityRequirement::new("orders", "delete")))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::access_denied("orders", "delete"));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_no_requirement_still_needs_an_identity() {
        let gate = gate();
        assert!(gate.authorize(&reader(), None).await.is_ok());
        assert_eq!(
            gate.authorize(&Credentials::Anonymous, None).await.unwrap_err().status_code(),
            401
        );
    }
}
