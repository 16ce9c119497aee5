//! In-memory backend
//!
//! Routines are Rust closures over named in-memory tables. Used by the test
//! suites of every crate that sits on the gateway, and handy for local
//! development without a database.
//!
//! A call outside a transaction runs against a copy of the tables that is
//! written back only when the routine succeeds, so a failing routine leaves
//! no partial effect. A transaction works on a snapshot taken at begin;
//! commit publishes it and rollback discards it.

use super::core::*;
use crate::binder::{BoundArgument, BoundCall};
use crate::call::ResultShape;
use crate::error::DriverError;
use crate::record::{RawResult, Record, RecordSet};
use crate::value::DatabaseValue;
use async_trait::async_trait;
use sluice_core::DatabaseConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Named tables of records
pub type MemoryTables = HashMap<String, Vec<Record>>;

type RoutineFn =
    dyn Fn(&mut MemoryTables, &[BoundArgument]) -> Result<Vec<RecordSet>, String> + Send + Sync;

#[derive(Clone)]
struct Routine {
    handler: Arc<RoutineFn>,
    delay: Duration,
}

#[derive(Default)]
struct MemoryState {
    routines: Mutex<HashMap<String, Routine>>,
    tables: Mutex<MemoryTables>,
    pools_created: AtomicUsize,
    invocations: AtomicUsize,
    connect_failures: AtomicU32,
    checkout_failures: AtomicU32,
    connect_delay: Mutex<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement a failure budget, reporting whether a failure should fire
fn take_failure(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-memory database backend. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a routine under `name`
    pub fn register<F>(&self, name: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&mut MemoryTables, &[BoundArgument]) -> Result<Vec<RecordSet>, String> + Send + Sync + 'static,
    {
        self.register_slow(name, Duration::ZERO, handler)
    }

    /// Register a routine that takes `delay` before it runs
    pub fn register_slow<F>(&self, name: impl Into<String>, delay: Duration, handler: F) -> &Self
    where
        F: Fn(&mut MemoryTables, &[BoundArgument]) -> Result<Vec<RecordSet>, String> + Send + Sync + 'static,
    {
        lock(&self.state.routines).insert(
            name.into(),
            Routine {
                handler: Arc::new(handler),
                delay,
            },
        );
        self
    }

    /// Replace the rows of a table
    pub fn seed(&self, table: impl Into<String>, rows: Vec<Record>) -> &Self {
        lock(&self.state.tables).insert(table.into(), rows);
        self
    }

    /// Committed rows of a table
    pub fn table(&self, table: &str) -> Vec<Record> {
        lock(&self.state.tables).get(table).cloned().unwrap_or_default()
    }

    /// Make the next `n` pool creations fail
    pub fn fail_next_connects(&self, n: u32) -> &Self {
        self.state.connect_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Make the next `n` checkouts fail before the routine runs. Inside a
    /// transaction this simulates losing the connection.
    pub fn fail_next_checkouts(&self, n: u32) -> &Self {
        self.state.checkout_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Slow down pool creation
    pub fn connect_delay(&self, delay: Duration) -> &Self {
        *lock(&self.state.connect_delay) = delay;
        self
    }

    /// Number of pools successfully created
    pub fn pools_created(&self) -> usize {
        self.state.pools_created.load(Ordering::SeqCst)
    }

    /// Number of routine invocations that reached a handler
    pub fn invocations(&self) -> usize {
        self.state.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseBackend for MemoryBackend {
    async fn create_pool(&self, _config: &DatabaseConfig) -> Result<Arc<dyn DatabasePool>, DriverError> {
        let delay = *lock(&self.state.connect_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if take_failure(&self.state.connect_failures) {
            return Err(DriverError::connection("connection refused"));
        }

        self.state.pools_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryPool {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryPool {
    state: Arc<MemoryState>,
    closed: AtomicBool,
}

impl MemoryPool {
    fn checkout(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::connection("connection pool is closed"));
        }
        if take_failure(&self.state.checkout_failures) {
            return Err(DriverError::connection("timed out waiting for a pooled connection"));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabasePool for MemoryPool {
    async fn invoke(&self, call: &BoundCall) -> Result<RawResult, DriverError> {
        self.checkout()?;
        let routine = resolve(&self.state, &call.routine)?;
        pause(&routine).await;

        let mut tables = lock(&self.state.tables);
        let mut working = tables.clone();
        let result = run(&self.state, &routine, &mut working, call)?;
        *tables = working;
        Ok(result)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DriverError> {
        self.checkout()?;
        let snapshot = lock(&self.state.tables).clone();
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            snapshot,
        }))
    }

    async fn health_check(&self) -> Result<Duration, DriverError> {
        self.checkout()?;
        Ok(Duration::ZERO)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct MemoryTransaction {
    state: Arc<MemoryState>,
    snapshot: MemoryTables,
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn invoke(&mut self, call: &BoundCall) -> Result<RawResult, DriverError> {
        if take_failure(&self.state.checkout_failures) {
            return Err(DriverError::connection("connection lost"));
        }
        let routine = resolve(&self.state, &call.routine)?;
        pause(&routine).await;
        run(&self.state, &routine, &mut self.snapshot, call)
    }

    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        let MemoryTransaction { state, snapshot } = *self;
        *lock(&state.tables) = snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

fn resolve(state: &MemoryState, name: &str) -> Result<Routine, DriverError> {
    lock(&state.routines)
        .get(name)
        .cloned()
        .ok_or_else(|| DriverError::statement(format!("routine {} does not exist", name)).with_code("42883"))
}

async fn pause(routine: &Routine) {
    if !routine.delay.is_zero() {
        tokio::time::sleep(routine.delay).await;
    }
}

fn run(
    state: &MemoryState,
    routine: &Routine,
    tables: &mut MemoryTables,
    call: &BoundCall,
) -> Result<RawResult, DriverError> {
    state.invocations.fetch_add(1, Ordering::SeqCst);
    let sets = (routine.handler)(tables, &call.arguments)
        .map_err(|message| DriverError::statement(message).with_code("P0001"))?;

    Ok(match call.shape {
        ResultShape::None => RawResult::empty(),
        _ => RawResult::new(sets),
    })
}

/// Look up a bound argument by name
pub fn argument<'a>(arguments: &'a [BoundArgument], name: &str) -> Option<&'a DatabaseValue> {
    arguments.iter().find(|arg| arg.name == name).map(|arg| &arg.value)
}
