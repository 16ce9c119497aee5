//! Database Backend Abstractions
//!
//! Backends own the driver: they open pools, run bound routine calls and
//! manage driver-level transactions. The gateway only talks to the traits in
//! [`core`].

pub mod core;
pub mod memory;
pub mod postgres;

pub use self::core::*;
pub use memory::{MemoryBackend, MemoryTables};
pub use postgres::PostgresBackend;
