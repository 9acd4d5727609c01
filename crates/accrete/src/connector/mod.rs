//! The transport accrete runs its catalog queries and DDL through.
//!
//! Rows come back as dialect-neutral [`Value`]s so inspectors don't need to
//! know which driver sits underneath.

use crate::error::ConnectorError;
use std::future::Future;
use std::pin::Pin;

mod postgres;
mod sqlite;

pub use postgres::PgConnector;
pub use sqlite::SqliteConnector;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single value read from, or bound into, a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Booleans, or integers read as 0/1.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

/// A result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Something that can run SQL against a database.
///
/// Implemented for [`SqliteConnector`] and [`PgConnector`]. Connecting is
/// driver-specific, so it lives on the concrete types.
pub trait Connector: Send + Sync {
    /// Run a query, returning all rows.
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, ConnectorError>>;

    /// Run a statement, returning the number of rows affected.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, ConnectorError>>;

    /// Whether calls can still go through.
    fn is_connected(&self) -> bool;

    /// Release the connection. Every later call fails with
    /// [`ConnectorError::NotConnected`].
    fn close(&self) -> BoxFuture<'_, Result<(), ConnectorError>>;
}

impl<C: Connector + ?Sized> Connector for &C {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, ConnectorError>> {
        (**self).query(sql, params)
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, ConnectorError>> {
        (**self).execute(sql, params)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), ConnectorError>> {
        (**self).close()
    }
}
