//! Authorization contexts, identities and requirements

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a request acts for. Both ids are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    account_id: u64,
    user_id: u64,
}

impl AuthContext {
    /// Account 1, user 1
    pub(crate) const DEVELOPMENT: AuthContext = AuthContext {
        account_id: 1,
        user_id: 1,
    };

    pub fn new(account_id: u64, user_id: u64) -> AuthResult<Self> {
        if account_id == 0 || user_id == 0 {
            return Err(AuthError::InvalidContext {
                message: format!(
                    "account and user ids must be positive (account {}, user {})",
                    account_id, user_id
                ),
            });
        }
        Ok(Self { account_id, user_id })
    }

    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }
}

/// The permission an operation needs on a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityRequirement {
    pub resource: String,
    pub permission: String,
}

impl SecurityRequirement {
    pub fn new(resource: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            permission: permission.into(),
        }
    }
}

impl fmt::Display for SecurityRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.permission)
    }
}

/// A resolved caller: their context plus granted permissions.
///
/// Grants are `"*"` (everything), `"resource:*"` (every permission on one
/// resource) or `"resource:permission"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub context: AuthContext,
    pub permissions: Vec<String>,
}

impl Identity {
    pub fn new(context: AuthContext) -> Self {
        Self {
            context,
            permissions: Vec::new(),
        }
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn grants(&self, requirement: &SecurityRequirement) -> bool {
        self.permissions.iter().any(|granted| match granted.split_once(':') {
            None => granted == "*",
            Some((resource, permission)) => {
                resource == requirement.resource
                    && (permission == "*" || permission == requirement.permission)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AuthContext {
        AuthContext::new(3, 9).unwrap()
    }

    #[test]
    fn test_ids_must_be_positive() {
        assert!(AuthContext::new(0, 1).is_err());
        assert!(AuthContext::new(1, 0).is_err());
        assert_eq!(context().account_id(), 3);
        assert_eq!(context().user_id(), 9);
    }

    #[test]
    fn test_context_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(context()).unwrap(),
            serde_json::json!({"accountId": 3, "userId": 9})
        );
    }

    #[test]
    fn test_grants() {
        let orders_read = SecurityRequirement::new("orders", "read");
        let orders_write = SecurityRequirement::new("orders", "write");
        let users_read = SecurityRequirement::new("users", "read");

        let reader = Identity::new(context()).grant("orders:read");
        assert!(reader.grants(&orders_read));
        assert!(!reader.grants(&orders_write));

        let owner = Identity::new(context()).grant("orders:*");
        assert!(owner.grants(&orders_write));
        assert!(!owner.grants(&users_read));

        let admin = Identity::new(context()).grant("*");
        assert!(admin.grants(&users_read));

        assert!(!Identity::new(context()).grants(&orders_read));
    }
}
