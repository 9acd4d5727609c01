//! DDL generation.
//!
//! A builder turns declared schemas into dialect-specific `CREATE TABLE` and
//! `ALTER TABLE ... ADD COLUMN` statements. It's a pure function of its
//! inputs: no connection, no I/O. There is no operation that
//! drops, renames, or retypes anything.

use crate::dialect::Dialect;
use crate::error::{BuildError, UnsupportedMigrationError, UnsupportedReason};
use crate::sql::quote_ident;
use accrete_schema::{ColumnDefinition, ColumnType, Scalar, SchemaValidationError, TableSchema};

mod postgres;
mod sqlite;

pub use postgres::PostgresBuilder;
pub use sqlite::SqliteBuilder;

/// Translates schema values into DDL for one dialect.
pub trait MigrationBuilder: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// The storage type for a portable column type.
    ///
    /// Row-encoding code must store values the same way (e.g. booleans as
    /// 0/1 and datetimes as ISO-8601 text on SQLite).
    fn map_type(&self, ty: ColumnType) -> &'static str;

    /// Whether a type string reported by the catalog is what [`map_type`]
    /// would have produced for `ty` (or an equivalent spelling).
    ///
    /// [`map_type`]: MigrationBuilder::map_type
    fn declared_type_matches(&self, ty: ColumnType, declared: &str) -> bool;

    /// A default value as a SQL literal.
    fn render_default(&self, value: &Scalar) -> String;

    /// The full column definition: name, type and constraints.
    fn column_sql(&self, column: &ColumnDefinition) -> String;

    /// Dialect-specific reasons a column can't be added to an existing table,
    /// on top of the ones every dialect shares.
    fn add_column_restriction(&self, _column: &ColumnDefinition) -> Option<UnsupportedReason> {
        None
    }

    /// A single `CREATE TABLE` statement with columns in declared order.
    ///
    /// The schema is validated first; nothing is generated for an invalid one.
    fn build_create_table(&self, schema: &TableSchema) -> Result<String, SchemaValidationError> {
        schema.validate()?;

        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|col| format!("    {}", self.column_sql(col)))
            .collect();

        Ok(format!(
            "CREATE TABLE {} (\n{}\n);",
            quote_ident(&schema.name),
            columns.join(",\n")
        ))
    }

    /// A single `ALTER TABLE ... ADD COLUMN` statement.
    ///
    /// Existing rows need a value for the new column, so a `NOT NULL` column
    /// must come with a default. Columns that would need the table rebuilt
    /// (primary keys, auto-increment) are refused.
    fn build_add_column(&self, table: &str, column: &ColumnDefinition) -> Result<String, BuildError> {
        column.validate(table)?;

        let unsupported = |reason| UnsupportedMigrationError {
            table: table.to_string(),
            column: column.name.clone(),
            reason,
        };

        if column.auto_increment {
            return Err(unsupported(UnsupportedReason::AutoIncrement).into());
        }
        if column.primary_key {
            return Err(unsupported(UnsupportedReason::PrimaryKey).into());
        }
        if !column.nullable && column.default.is_none() {
            return Err(unsupported(UnsupportedReason::NotNullWithoutDefault).into());
        }
        if let Some(reason) = self.add_column_restriction(column) {
            return Err(unsupported(reason).into());
        }

        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            quote_ident(table),
            self.column_sql(column)
        ))
    }
}

/// The `NOT NULL` / `UNIQUE` / `DEFAULT` suffix for a non-key column, in that order.
fn constraint_suffix<B: MigrationBuilder + ?Sized>(builder: &B, column: &ColumnDefinition) -> String {
    let mut out = String::new();
    if !column.nullable {
        out.push_str(" NOT NULL");
    }
    if column.unique {
        out.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        out.push_str(" DEFAULT ");
        out.push_str(&builder.render_default(default));
    }
    out
}

#[cfg(test)]
mod tests;
