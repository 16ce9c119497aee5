//! # sluice-auth
//!
//! Who a request acts for and what it may do.
//!
//! A [`PermissionGate`] resolves request [`Credentials`] through an
//! [`IdentityProvider`] and checks the granted permissions against a
//! [`SecurityRequirement`], yielding the [`AuthContext`] handlers run under.

pub mod context;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod provider;

pub use context::{AuthContext, Identity, SecurityRequirement};
pub use credentials::Credentials;
pub use error::{AuthError, AuthResult};
pub use gate::PermissionGate;
pub use provider::{IdentityProvider, StaticIdentityProvider, TokenIdentityProvider};
