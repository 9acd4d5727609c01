//! Catalog introspection.
//!
//! An inspector answers two questions about the live database: does a table
//! exist, and which columns does it have. It reads only the database's own
//! catalog and never writes.

use crate::connector::{BoxFuture, Connector, Row, Value};
use crate::error::InspectionError;
use accrete_schema::ExistingColumnInfo;

mod postgres;
mod sqlite;

pub use postgres::PostgresInspector;
pub use sqlite::SqliteInspector;

/// Reads table and column information from a database catalog.
///
/// One implementation per dialect; the runner only sees this trait.
pub trait SchemaInspector: Send + Sync {
    /// Whether a table named exactly `table` (case-sensitive) exists.
    ///
    /// Absence is `Ok(false)`, never an error.
    fn table_exists<'a, C: Connector + ?Sized>(
        &'a self,
        conn: &'a C,
        table: &'a str,
    ) -> BoxFuture<'a, Result<bool, InspectionError>>;

    /// The columns of `table`, in catalog order.
    ///
    /// Fails with [`InspectionError::TableNotFound`] if the table is absent.
    fn list_columns<'a, C: Connector + ?Sized>(
        &'a self,
        conn: &'a C,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ExistingColumnInfo>, InspectionError>>;
}

/// Run a catalog query for `table`, attaching context to failures.
async fn catalog_query<C: Connector + ?Sized>(
    conn: &C,
    table: &str,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, InspectionError> {
    conn.query(sql, params)
        .await
        .map_err(|source| InspectionError::Query {
            table: table.to_string(),
            sql: sql.to_string(),
            source,
        })
}

/// Read a single boolean out of a one-row, one-column result.
fn single_bool(rows: &[Row], table: &str, sql: &str) -> Result<bool, InspectionError> {
    rows.first()
        .and_then(|row| row.get(0))
        .and_then(Value::as_bool)
        .ok_or_else(|| InspectionError::UnexpectedRow {
            table: table.to_string(),
            sql: sql.to_string(),
            detail: "expected a single boolean".to_string(),
        })
}

fn unexpected(table: &str, sql: &str, detail: impl Into<String>) -> InspectionError {
    InspectionError::UnexpectedRow {
        table: table.to_string(),
        sql: sql.to_string(),
        detail: detail.into(),
    }
}
