//! Additive, idempotent schema migrations for SQLite and Postgres.
//!
//! accrete compares a list of declared tables with what the database catalog
//! reports and issues only the DDL needed to close the gap:
//! - absent tables are created with every declared column
//! - absent columns are added to existing tables, in declared order
//! - nothing is ever dropped, renamed or retyped
//!
//! Running the same list twice issues no SQL the second time.
//!
//! # Usage
//!
//! ```ignore
//! use accrete::{ColumnDefinition, ColumnType, MigrationRunner, SqliteConnector, TableSchema};
//!
//! let users = TableSchema::new(
//!     "users",
//!     vec![
//!         ColumnDefinition::new("id", ColumnType::Integer).primary_key().auto_increment(),
//!         ColumnDefinition::new("name", ColumnType::Text).not_null(),
//!     ],
//! );
//!
//! let conn = SqliteConnector::connect("sqlite://app.db").await?;
//! let runner = MigrationRunner::sqlite(conn);
//! let report = runner.run(&[users], true).await?;
//! ```
//!
//! Only one pass should run against a database at a time. Two processes
//! migrating concurrently can both see a table as absent, and the second
//! `CREATE TABLE` then fails. Serialize startup (or hold an advisory lock
//! around [`MigrationRunner::run`]) when several instances share a database.
//!
//! Table names are looked up exactly as declared. SQLite itself matches table
//! names without regard to ASCII case, so declaring `Users` next to an
//! existing `users` makes every pass report a failed `CREATE TABLE` for it.
//! Declare tables with the spelling already in the database.

mod builder;
mod connector;
mod dialect;
mod error;
mod inspect;
mod report;
mod runner;
pub mod sql;
mod startup;
mod traced;

pub use builder::{MigrationBuilder, PostgresBuilder, SqliteBuilder};
pub use connector::{BoxFuture, Connector, PgConnector, Row, SqliteConnector, Value};
pub use dialect::{Dialect, UnknownDialect};
pub use error::{
    BuildError, ConnectorError, Error, ExecutionError, InspectionError, MigrationError,
    UnsupportedMigrationError, UnsupportedReason,
};
pub use inspect::{PostgresInspector, SchemaInspector, SqliteInspector};
pub use report::{MemorySink, MigrationReport, Outcome, ReportSink, TracingSink};
pub use runner::{MigrationPlan, MigrationRunner, TablePlan};
pub use startup::{MigrationMode, MigrationSettings, migrate_on_startup};
pub use traced::{ConnectorExt, TracedConn};

pub use accrete_schema::{
    ColumnDefinition, ColumnType, ExistingColumnInfo, Scalar, SchemaRegistry, SchemaSource,
    SchemaValidationError, TableSchema,
};
