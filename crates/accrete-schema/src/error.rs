use crate::ColumnType;
use thiserror::Error;

/// A declared schema breaks one of its invariants.
///
/// Raised before any SQL is generated for the offending table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaValidationError {
    #[error("table name is empty")]
    EmptyTableName,

    #[error("table {table}: a column has an empty name")]
    EmptyColumnName { table: String },

    #[error("table {table}: no columns declared")]
    NoColumns { table: String },

    #[error("table {table}: column {column} is declared more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table {table}: more than one primary key column ({})", columns.join(", "))]
    MultiplePrimaryKeys { table: String, columns: Vec<String> },

    #[error("table {table}: column {column} is auto-increment but not the primary key")]
    AutoIncrementWithoutPrimaryKey { table: String, column: String },

    #[error("table {table}: column {column} is auto-increment but has type {column_type}")]
    AutoIncrementNotInteger {
        table: String,
        column: String,
        column_type: ColumnType,
    },

    #[error("table {table}: default {default} does not fit column {column} of type {column_type}")]
    IncompatibleDefault {
        table: String,
        column: String,
        column_type: ColumnType,
        default: String,
    },

    #[error("table {table} is declared more than once")]
    DuplicateTable { table: String },
}

/// A string that doesn't name a [`ColumnType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column type: {0:?}")]
pub struct ParseColumnTypeError(pub String);
