use accrete_schema::SchemaValidationError;
use thiserror::Error;

/// The transport failed or refused a call.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connection is closed")]
    NotConnected,

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("could not create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("could not get a pooled connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("column {column} has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },
}

/// Reading the catalog failed. Fatal for the whole migration pass.
#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("catalog query for table {table} failed: {source}\n  sql: {sql}")]
    Query {
        table: String,
        sql: String,
        #[source]
        source: ConnectorError,
    },

    #[error("table {table} does not exist")]
    TableNotFound { table: String },

    #[error("catalog query for table {table} returned an unexpected row ({detail})\n  sql: {sql}")]
    UnexpectedRow {
        table: String,
        sql: String,
        detail: String,
    },
}

/// Why an additive change can't be expressed safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// Existing rows would have no value for the new column.
    NotNullWithoutDefault,
    /// A table's primary key can't be added after the fact.
    PrimaryKey,
    /// Identity/auto-increment columns can't be added after the fact.
    AutoIncrement,
    /// The dialect can't add a column with a UNIQUE constraint.
    Unique,
}

impl std::fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedReason::NotNullWithoutDefault => {
                write!(f, "a NOT NULL column needs a default to be added")
            }
            UnsupportedReason::PrimaryKey => write!(f, "a primary key column cannot be added"),
            UnsupportedReason::AutoIncrement => {
                write!(f, "an auto-increment column cannot be added")
            }
            UnsupportedReason::Unique => write!(f, "a UNIQUE column cannot be added"),
        }
    }
}

/// An additive change that the target dialect can't apply safely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot add column {column} to table {table}: {reason}")]
pub struct UnsupportedMigrationError {
    pub table: String,
    pub column: String,
    pub reason: UnsupportedReason,
}

/// The database rejected generated DDL.
#[derive(Debug, Error)]
#[error("executing DDL for table {table} failed: {source}\n  sql: {sql}")]
pub struct ExecutionError {
    pub table: String,
    pub sql: String,
    #[source]
    pub source: ConnectorError,
}

/// Why the builder produced no SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedMigrationError),
}

/// A failure scoped to one table. Recorded in the report; the rest of the
/// batch keeps going.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedMigrationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<BuildError> for MigrationError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Validation(e) => MigrationError::Validation(e),
            BuildError::Unsupported(e) => MigrationError::Unsupported(e),
        }
    }
}

/// A failure that aborts the whole migration pass.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Inspection(#[from] InspectionError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}
