//! Traced connector wrapper.
//!
//! Wraps any [`Connector`] and logs every query and statement via tracing.

use crate::connector::{BoxFuture, Connector, Row, Value};
use crate::error::ConnectorError;
use tracing::Instrument;

/// A wrapper around a connector that logs all calls via tracing.
///
/// This is a thin wrapper that delegates to the underlying connector but adds
/// `tracing::debug_span!` around each query/execute call.
///
/// # Example
///
/// ```ignore
/// use accrete::{ConnectorExt, SqliteConnector};
///
/// let conn = SqliteConnector::in_memory().await?;
/// let traced = conn.traced();
///
/// // Logged at debug level, with the row count recorded on the span
/// let rows = traced.query("SELECT name FROM sqlite_master", &[]).await?;
/// ```
pub struct TracedConn<'a, C: Connector + ?Sized> {
    conn: &'a C,
}

impl<'a, C: Connector + ?Sized> TracedConn<'a, C> {
    /// Create a new traced connector wrapper.
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

impl<C: Connector + ?Sized> Connector for TracedConn<'_, C> {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, ConnectorError>> {
        Box::pin(async move {
            let span = tracing::debug_span!(
                "db.query",
                sql = %sql,
                params = params.len(),
                rows = tracing::field::Empty,
            );
            let rows = self
                .conn
                .query(sql, params)
                .instrument(span.clone())
                .await?;
            span.record("rows", rows.len());
            Ok(rows)
        })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, ConnectorError>> {
        Box::pin(async move {
            let span = tracing::debug_span!(
                "db.execute",
                sql = %sql,
                params = params.len(),
                affected = tracing::field::Empty,
            );
            let affected = self
                .conn
                .execute(sql, params)
                .instrument(span.clone())
                .await?;
            span.record("affected", affected);
            Ok(affected)
        })
    }

    fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), ConnectorError>> {
        self.conn.close()
    }
}

/// Extension trait to get a traced wrapper from a connector.
pub trait ConnectorExt: Connector {
    /// Wrap this connector in a `TracedConn` for query logging.
    fn traced(&self) -> TracedConn<'_, Self> {
        TracedConn::new(self)
    }
}

impl<C: Connector + ?Sized> ConnectorExt for C {}
