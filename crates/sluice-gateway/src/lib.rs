//! # sluice-gateway
//!
//! Stored-routine gateway: validated routine calls, bound parameters, a lazily
//! created shared pool, explicit transaction scopes and result shaping.
//!
//! ```no_run
//! use sluice_gateway::{DatabaseGateway, PostgresBackend, ProcedureCall};
//! use sluice_core::DatabaseConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), sluice_gateway::GatewayError> {
//! let gateway = DatabaseGateway::new(Arc::new(PostgresBackend::new()), DatabaseConfig::default());
//!
//! let account = gateway
//!     .execute(&ProcedureCall::new("accounts.get_account").bind("account_id", 7), None)
//!     .await?
//!     .into_single();
//!
//! let mut txn = gateway.begin_transaction().await?;
//! gateway
//!     .execute(&ProcedureCall::command("accounts.close").bind("account_id", 7), Some(&mut txn))
//!     .await?;
//! gateway.commit(&mut txn).await?;
//! # let _ = account;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod binder;
pub mod call;
pub mod error;
pub mod gateway;
pub mod pool;
pub mod record;
pub mod shape;
pub mod transaction;
pub mod value;

pub use backends::{DatabaseBackend, DatabasePool, DatabaseTransaction, MemoryBackend, MemoryTables, PostgresBackend};
pub use binder::{BoundArgument, BoundCall, ParameterBinder};
pub use call::{Parameters, ProcedureCall, ResultShape};
pub use error::{DriverError, DriverErrorKind, GatewayError, GatewayResult};
pub use gateway::{DatabaseGateway, ExecutionPolicy};
pub use pool::ConnectionPool;
pub use record::{RawResult, Record, RecordSet};
pub use shape::{shape_result, LabeledSets, RoutineOutput};
pub use transaction::{TransactionScope, TransactionState};
pub use value::DatabaseValue;
