use super::{BoxFuture, Connector, Row, Value};
use crate::error::ConnectorError;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Row as _, Sqlite, SqliteConnection, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A single SQLite connection.
///
/// The connection is owned exclusively; calls are serialized through a lock.
pub struct SqliteConnector {
    conn: Mutex<Option<SqliteConnection>>,
    open: AtomicBool,
}

impl SqliteConnector {
    /// Open a database from a URL such as `sqlite://app.db` or `sqlite::memory:`.
    ///
    /// File databases are created if missing.
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let conn = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .connect()
            .await?;
        tracing::debug!(url, "connected to sqlite");
        Ok(Self::from_connection(conn))
    }

    /// Open a fresh, private in-memory database.
    pub async fn in_memory() -> Result<Self, ConnectorError> {
        Self::connect("sqlite::memory:").await
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: SqliteConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            open: AtomicBool::new(true),
        }
    }
}

impl Connector for SqliteConnector {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, ConnectorError>> {
        Box::pin(async move {
            let mut guard = self.conn.lock().await;
            let conn = guard.as_mut().ok_or(ConnectorError::NotConnected)?;
            let rows = bind_all(sqlx::query(sql), params)
                .fetch_all(&mut *conn)
                .await?;
            rows.iter().map(decode_row).collect()
        })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, ConnectorError>> {
        Box::pin(async move {
            let mut guard = self.conn.lock().await;
            let conn = guard.as_mut().ok_or(ConnectorError::NotConnected)?;
            let result = bind_all(sqlx::query(sql), params)
                .execute(&mut *conn)
                .await?;
            Ok(result.rows_affected())
        })
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) -> BoxFuture<'_, Result<(), ConnectorError>> {
        Box::pin(async move {
            self.open.store(false, Ordering::Release);
            let conn = self.conn.lock().await.take();
            if let Some(conn) = conn {
                sqlx::Connection::close(conn).await?;
            }
            Ok(())
        })
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &'q [Value]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Boolean(v) => query.bind(*v),
            Value::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

/// Read a row by the storage class of each value, which is what SQLite
/// actually has (declared column types are only affinities).
fn decode_row(row: &SqliteRow) -> Result<Row, ConnectorError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::Integer(row.try_get_unchecked(idx)?),
            Some("REAL") => Value::Real(row.try_get_unchecked(idx)?),
            Some("BLOB") => Value::Blob(row.try_get_unchecked(idx)?),
            Some(_) => Value::Text(row.try_get_unchecked(idx)?),
        };
        values.push(value);
    }
    Ok(Row::new(values))
}
