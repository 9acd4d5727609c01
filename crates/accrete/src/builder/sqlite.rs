use super::{MigrationBuilder, constraint_suffix};
use crate::dialect::Dialect;
use crate::error::UnsupportedReason;
use crate::sql::{Lit, hex, quote_ident};
use accrete_schema::{ColumnDefinition, ColumnType, Scalar};

/// DDL for SQLite.
///
/// SQLite has no boolean or timestamp storage classes: booleans are stored as
/// 0/1 integers and datetimes as ISO-8601 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBuilder;

/// SQLite's type affinity for a declared column type.
///
/// See <https://www.sqlite.org/datatype3.html#determination_of_column_affinity>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

fn affinity(declared: &str) -> Affinity {
    let declared = declared.to_ascii_uppercase();
    if declared.contains("INT") {
        Affinity::Integer
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
        Affinity::Text
    } else if declared.contains("BLOB") || declared.trim().is_empty() {
        Affinity::Blob
    } else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB") {
        Affinity::Real
    } else {
        Affinity::Numeric
    }
}

impl MigrationBuilder for SqliteBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn map_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "INTEGER",
            ColumnType::DateTime => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }

    fn declared_type_matches(&self, ty: ColumnType, declared: &str) -> bool {
        affinity(declared) == affinity(self.map_type(ty))
    }

    fn render_default(&self, value: &Scalar) -> String {
        match value {
            Scalar::Integer(v) => v.to_string(),
            Scalar::Real(v) => format!("{v:?}"),
            Scalar::Text(v) => Lit(v).to_string(),
            Scalar::Boolean(true) => "1".to_string(),
            Scalar::Boolean(false) => "0".to_string(),
            Scalar::DateTime(v) => Lit(v.to_string()).to_string(),
            Scalar::Blob(v) => format!("X'{}'", hex(v)),
        }
    }

    fn column_sql(&self, column: &ColumnDefinition) -> String {
        let mut def = format!(
            "{} {}",
            quote_ident(&column.name),
            self.map_type(column.column_type)
        );

        if column.primary_key {
            def.push_str(" PRIMARY KEY");
            if column.auto_increment {
                def.push_str(" AUTOINCREMENT");
            }
            // Only an INTEGER PRIMARY KEY aliases the rowid and can't hold NULL.
            if column.column_type != ColumnType::Integer {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                def.push_str(" DEFAULT ");
                def.push_str(&self.render_default(default));
            }
        } else {
            def.push_str(&constraint_suffix(self, column));
        }

        def
    }

    fn add_column_restriction(&self, column: &ColumnDefinition) -> Option<UnsupportedReason> {
        // ALTER TABLE ADD COLUMN refuses UNIQUE constraints.
        column.unique.then_some(UnsupportedReason::Unique)
    }
}
