//! PostgreSQL Backend Implementation
//!
//! Routine calls are rendered from validated identifiers and `$n`
//! placeholders only; every non-null value travels as a bound parameter.
//!
//! | shape    | statement                                                    |
//! |----------|--------------------------------------------------------------|
//! | `Single` | `SELECT * FROM routine(a => $1, b => $2)`                    |
//! | `Multi`  | routine returns refcursors, each read with `FETCH ALL`       |
//! | `None`   | `CALL routine(a => $1, b => $2)`                             |
//!
//! Null arguments are written as an untyped `NULL` so PostgreSQL resolves
//! the routine signature from the declared parameter type.

use super::core::*;
use crate::binder::BoundCall;
use crate::call::ResultShape;
use crate::error::DriverError;
use crate::record::{RawResult, Record, RecordSet};
use crate::value::DatabaseValue;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sluice_core::DatabaseConfig;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo, ValueRef};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// PostgreSQL database backend implementation
#[derive(Debug, Default)]
pub struct PostgresBackend;

impl PostgresBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    async fn create_pool(&self, config: &DatabaseConfig) -> Result<Arc<dyn DatabasePool>, DriverError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                DriverError::connection(format!(
                    "failed to create PostgreSQL pool for {}: {}",
                    config.endpoint(),
                    e
                ))
            })?;

        Ok(Arc::new(PostgresPool::new(pool)))
    }

    fn name(&self) -> &'static str {
        "postgresql"
    }
}

/// PostgreSQL connection pool implementation
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    async fn invoke(&self, call: &BoundCall) -> Result<RawResult, DriverError> {
        // Refcursors only live inside a transaction.
        if call.shape == ResultShape::Multi {
            let mut tx = self.pool.begin().await.map_err(checkout_error)?;
            let result = run_call(&mut tx, call).await?;
            tx.commit().await?;
            return Ok(result);
        }

        let mut conn = self.pool.acquire().await.map_err(checkout_error)?;
        run_call(&mut conn, call).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DriverError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn health_check(&self) -> Result<Duration, DriverError> {
        let start = Instant::now();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DriverError::connection(format!("health check failed: {}", e)))?;

        Ok(start.elapsed())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// PostgreSQL transaction implementation
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl DatabaseTransaction for PostgresTransaction {
    async fn invoke(&mut self, call: &BoundCall) -> Result<RawResult, DriverError> {
        run_call(&mut self.tx, call).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn checkout_error(err: sqlx::Error) -> DriverError {
    DriverError::connection(format!("failed to check out a connection: {}", err))
}

async fn run_call(conn: &mut PgConnection, call: &BoundCall) -> Result<RawResult, DriverError> {
    let sql = render_statement(call);
    let query = call
        .values()
        .filter(|value| !value.is_null())
        .fold(sqlx::query(&sql), bind_value);

    match call.shape {
        ResultShape::None => {
            query.execute(&mut *conn).await?;
            Ok(RawResult::empty())
        }
        ResultShape::Single => {
            let row = query.fetch_optional(&mut *conn).await?;
            let set = match row {
                Some(row) => vec![row_to_record(&row)?],
                None => Vec::new(),
            };
            Ok(RawResult::new(vec![set]))
        }
        ResultShape::Multi => {
            let cursors = query.fetch_all(&mut *conn).await?;
            let mut record_sets = Vec::with_capacity(cursors.len());
            for cursor in &cursors {
                let name: String = cursor.try_get(0)?;
                let fetch = format!("FETCH ALL FROM {}", quote_identifier(&name));
                let rows = sqlx::query(&fetch).fetch_all(&mut *conn).await?;
                record_sets.push(rows_to_set(&rows)?);
            }
            Ok(RawResult::new(record_sets))
        }
    }
}

fn render_statement(call: &BoundCall) -> String {
    let mut placeholder = 0;
    let arguments = call
        .arguments
        .iter()
        .map(|arg| {
            if arg.value.is_null() {
                format!("{} => NULL", arg.name)
            } else {
                placeholder += 1;
                format!("{} => ${}", arg.name, placeholder)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    match call.shape {
        ResultShape::Single => format!("SELECT * FROM {}({})", call.routine, arguments),
        ResultShape::Multi => format!(
            "SELECT cursor_name::text FROM {}({}) AS result_cursors(cursor_name)",
            call.routine, arguments
        ),
        ResultShape::None => format!("CALL {}({})", call.routine, arguments),
    }
}

/// Cursor names come from the server; quote them anyway
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind a DatabaseValue to a sqlx query
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query,
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Uuid(u) => query.bind(*u),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        DatabaseValue::Json(j) => query.bind(j.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Time(t) => query.bind(*t),
        DatabaseValue::Array(items) => bind_array(query, items),
    }
}

/// Collect array elements of one kind; nulls are kept as `None`
fn homogeneous<T>(items: &[DatabaseValue], pick: impl Fn(&DatabaseValue) -> Option<T>) -> Option<Vec<Option<T>>> {
    items
        .iter()
        .map(|item| if item.is_null() { Some(None) } else { pick(item).map(Some) })
        .collect()
}

/// Bind an array as a typed PostgreSQL array when its elements share one
/// scalar type, otherwise as a jsonb array
fn bind_array<'q>(
    query: Query<'q, Postgres, PgArguments>,
    items: &[DatabaseValue],
) -> Query<'q, Postgres, PgArguments> {
    match items.iter().find(|item| !item.is_null()) {
        Some(DatabaseValue::Bool(_)) => {
            if let Some(values) = homogeneous(items, |v| match v {
                DatabaseValue::Bool(b) => Some(*b),
                _ => None,
            }) {
                return query.bind(values);
            }
        }
        Some(DatabaseValue::Int32(_)) | Some(DatabaseValue::Int64(_)) => {
            if items.iter().any(|item| matches!(item, DatabaseValue::Int64(_))) {
                if let Some(values) = homogeneous(items, DatabaseValue::as_i64) {
                    return query.bind(values);
                }
            } else if let Some(values) = homogeneous(items, |v| match v {
                DatabaseValue::Int32(i) => Some(*i),
                _ => None,
            }) {
                return query.bind(values);
            }
        }
        Some(DatabaseValue::Float64(_)) => {
            if let Some(values) = homogeneous(items, |v| match v {
                DatabaseValue::Float64(f) => Some(*f),
                _ => None,
            }) {
                return query.bind(values);
            }
        }
        Some(DatabaseValue::String(_)) => {
            if let Some(values) = homogeneous(items, |v| v.as_str().map(str::to_string)) {
                return query.bind(values);
            }
        }
        Some(DatabaseValue::Uuid(_)) => {
            if let Some(values) = homogeneous(items, |v| match v {
                DatabaseValue::Uuid(u) => Some(*u),
                _ => None,
            }) {
                return query.bind(values);
            }
        }
        _ => {}
    }

    query.bind(JsonValue::Array(items.iter().map(DatabaseValue::to_json).collect()))
}

fn rows_to_set(rows: &[PgRow]) -> Result<RecordSet, DriverError> {
    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &PgRow) -> Result<Record, DriverError> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.push(column.name(), column_value(row, index)?);
    }
    Ok(record)
}

/// Convert a PostgreSQL column value to DatabaseValue
fn column_value(row: &PgRow, index: usize) -> Result<DatabaseValue, DriverError> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let column = &row.columns()[index];
    let value = match column.type_info().name() {
        "BOOL" => DatabaseValue::Bool(row.try_get(index)?),
        "INT2" => DatabaseValue::Int32(i32::from(row.try_get::<i16, _>(index)?)),
        "INT4" => DatabaseValue::Int32(row.try_get(index)?),
        "INT8" => DatabaseValue::Int64(row.try_get(index)?),
        "FLOAT4" => DatabaseValue::Float64(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => DatabaseValue::Float64(row.try_get(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => DatabaseValue::String(row.try_get(index)?),
        "UUID" => DatabaseValue::Uuid(row.try_get(index)?),
        "TIMESTAMPTZ" => DatabaseValue::DateTime(row.try_get(index)?),
        "TIMESTAMP" => {
            let naive: chrono::NaiveDateTime = row.try_get(index)?;
            DatabaseValue::DateTime(naive.and_utc())
        }
        "DATE" => DatabaseValue::Date(row.try_get(index)?),
        "TIME" => DatabaseValue::Time(row.try_get(index)?),
        "BYTEA" => DatabaseValue::Bytes(row.try_get(index)?),
        // Exact decimal text
        "NUMERIC" => DatabaseValue::String(row.try_get::<Decimal, _>(index)?.to_string()),
        "JSON" | "JSONB" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index)?),
        "BOOL[]" => array_value(row.try_get::<Vec<Option<bool>>, _>(index)?, DatabaseValue::Bool),
        "INT2[]" => array_value(row.try_get::<Vec<Option<i16>>, _>(index)?, |i| {
            DatabaseValue::Int32(i32::from(i))
        }),
        "INT4[]" => array_value(row.try_get::<Vec<Option<i32>>, _>(index)?, DatabaseValue::Int32),
        "INT8[]" => array_value(row.try_get::<Vec<Option<i64>>, _>(index)?, DatabaseValue::Int64),
        "FLOAT8[]" => array_value(row.try_get::<Vec<Option<f64>>, _>(index)?, DatabaseValue::Float64),
        "TEXT[]" | "VARCHAR[]" => {
            array_value(row.try_get::<Vec<Option<String>>, _>(index)?, DatabaseValue::String)
        }
        "UUID[]" => array_value(row.try_get::<Vec<Option<Uuid>>, _>(index)?, DatabaseValue::Uuid),
        "NUMERIC[]" => array_value(row.try_get::<Vec<Option<Decimal>>, _>(index)?, |d| {
            DatabaseValue::String(d.to_string())
        }),
        other => {
            return Err(DriverError::statement(format!(
                "column '{}' has unsupported type {}; cast it in the routine",
                column.name(),
                other
            )))
        }
    };
    Ok(value)
}

fn array_value<T>(items: Vec<Option<T>>, convert: impl Fn(T) -> DatabaseValue) -> DatabaseValue {
    DatabaseValue::Array(
        items
            .into_iter()
            .map(|item| item.map(&convert).unwrap_or(DatabaseValue::Null))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ParameterBinder;
    use crate::call::ProcedureCall;

    fn bound(call: ProcedureCall) -> BoundCall {
        ParameterBinder::new().bind(&call).unwrap()
    }

    #[test]
    fn test_single_renders_select_with_named_placeholders() {
        let call = bound(
            ProcedureCall::new("accounts.get_account")
                .bind("account_id", 5)
                .bind("include_closed", false),
        );
        assert_eq!(
            render_statement(&call),
            "SELECT * FROM accounts.get_account(account_id => $1, include_closed => $2)"
        );
    }

    #[test]
    fn test_command_renders_call() {
        let call = bound(ProcedureCall::command("audit.touch").bind("user_id", 1));
        assert_eq!(render_statement(&call), "CALL audit.touch(user_id => $1)");
    }

    #[test]
    fn test_nulls_are_literal_and_placeholders_stay_contiguous() {
        let call = bound(
            ProcedureCall::new("search")
                .bind("name", "a")
                .bind("region", Option::<String>::None)
                .bind("max_rows", 10),
        );
        assert_eq!(
            render_statement(&call),
            "SELECT * FROM search(name => $1, region => NULL, max_rows => $2)"
        );
    }

    #[test]
    fn test_multi_reads_cursor_names() {
        let call = bound(ProcedureCall::multi("reports.dashboard"));
        assert_eq!(
            render_statement(&call),
            "SELECT cursor_name::text FROM reports.dashboard() AS result_cursors(cursor_name)"
        );
    }

    #[test]
    fn test_array_elements_of_one_kind_bind_as_typed_array() {
        let ints = vec![DatabaseValue::Int32(1), DatabaseValue::Null];
        assert_eq!(homogeneous(&ints, DatabaseValue::as_i64), Some(vec![Some(1), None]));

        let mixed = vec![DatabaseValue::Int32(1), DatabaseValue::from("x")];
        assert_eq!(homogeneous(&mixed, DatabaseValue::as_i64), None);
    }

    #[test]
    fn test_array_columns_keep_null_elements() {
        assert_eq!(
            array_value(vec![Some(3), None], DatabaseValue::Int32),
            DatabaseValue::Array(vec![DatabaseValue::Int32(3), DatabaseValue::Null])
        );
        assert_eq!(
            array_value(vec![Some(Decimal::new(1999, 2))], |d| DatabaseValue::String(d.to_string())),
            DatabaseValue::Array(vec![DatabaseValue::String("19.99".to_string())])
        );
    }

    #[test]
    fn test_values_never_reach_statement_text() {
        let call = bound(ProcedureCall::new("login").bind("password", "' OR 1=1 --"));
        assert!(!render_statement(&call).contains("OR 1=1"));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("<unnamed portal 1>"), "\"<unnamed portal 1>\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
