//! Transaction scopes
//!
//! A [`TransactionScope`] is created by
//! [`DatabaseGateway::begin_transaction`](crate::DatabaseGateway::begin_transaction)
//! and terminated by exactly one of `commit` or `rollback`. It is not `Clone`
//! and not `Sync`; calls borrow it mutably, so two operations cannot drive it
//! at once.

use crate::backends::DatabaseTransaction;
use crate::error::{GatewayError, GatewayResult};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Lifecycle of a transaction scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "active"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// One driver transaction on one checked-out connection
pub struct TransactionScope {
    id: Uuid,
    state: TransactionState,
    inner: Option<Box<dyn DatabaseTransaction>>,
}

impl TransactionScope {
    pub(crate) fn new(inner: Box<dyn DatabaseTransaction>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TransactionState::Active,
            inner: Some(inner),
        }
    }

    /// Identifier used in log lines
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// The driver transaction, while the scope is active
    pub(crate) fn connection(&mut self) -> GatewayResult<&mut (dyn DatabaseTransaction + 'static)> {
        let (id, state) = (self.id, self.state);
        match self.inner.as_mut() {
            Some(inner) if state == TransactionState::Active => Ok(inner.as_mut()),
            _ => Err(GatewayError::invalid_state(format!(
                "transaction {} is already {}",
                id, state
            ))),
        }
    }

    /// Move the scope into its terminal state and hand back the driver
    /// transaction. The scope is terminated even if the driver call that
    /// follows fails.
    pub(crate) fn terminate(&mut self, next: TransactionState) -> GatewayResult<Box<dyn DatabaseTransaction>> {
        if self.state != TransactionState::Active {
            return Err(GatewayError::invalid_state(format!(
                "cannot mark transaction {} {}: it is already {}",
                self.id, next, self.state
            )));
        }

        let inner = self
            .inner
            .take()
            .ok_or_else(|| GatewayError::invalid_state(format!("transaction {} has no connection", self.id)))?;
        self.state = next;
        Ok(inner)
    }
}

impl fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionScope")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.state == TransactionState::Active && self.inner.is_some() {
            warn!(
                "Transaction {} dropped without explicit commit or rollback - this will cause an automatic rollback",
                self.id
            );
        }
    }
}
