use super::{MigrationBuilder, constraint_suffix};
use crate::dialect::Dialect;
use crate::sql::{Lit, hex, quote_ident};
use accrete_schema::{ColumnDefinition, ColumnType, Scalar};

/// DDL for Postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBuilder;

impl MigrationBuilder for PostgresBuilder {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn map_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Integer => "BIGINT",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::DateTime => "TIMESTAMPTZ",
            ColumnType::Blob => "BYTEA",
        }
    }

    fn declared_type_matches(&self, ty: ColumnType, declared: &str) -> bool {
        let declared = declared.trim().to_ascii_lowercase();
        let accepted: &[&str] = match ty {
            ColumnType::Integer => &["bigint", "int8", "integer", "int4", "int", "smallint", "int2"],
            ColumnType::Text => &["text", "character varying", "varchar", "character", "bpchar"],
            ColumnType::Real => &["double precision", "float8", "real", "float4", "numeric"],
            ColumnType::Boolean => &["boolean", "bool"],
            ColumnType::DateTime => &[
                "timestamp with time zone",
                "timestamptz",
                "timestamp without time zone",
                "timestamp",
            ],
            ColumnType::Blob => &["bytea"],
        };
        accepted.contains(&declared.as_str())
    }

    fn render_default(&self, value: &Scalar) -> String {
        match value {
            Scalar::Integer(v) => v.to_string(),
            Scalar::Real(v) => format!("{v:?}"),
            Scalar::Text(v) => Lit(v).to_string(),
            Scalar::Boolean(true) => "TRUE".to_string(),
            Scalar::Boolean(false) => "FALSE".to_string(),
            Scalar::DateTime(v) => Lit(v.to_string()).to_string(),
            Scalar::Blob(v) => format!("'\\x{}'", hex(v)),
        }
    }

    fn column_sql(&self, column: &ColumnDefinition) -> String {
        let name = quote_ident(&column.name);

        if column.primary_key && column.auto_increment {
            return format!(
                "{} {} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
                name,
                self.map_type(column.column_type)
            );
        }

        let mut def = format!("{} {}", name, self.map_type(column.column_type));
        if column.primary_key {
            // PRIMARY KEY implies NOT NULL and UNIQUE.
            def.push_str(" PRIMARY KEY");
            if let Some(default) = &column.default {
                def.push_str(" DEFAULT ");
                def.push_str(&self.render_default(default));
            }
        } else {
            def.push_str(&constraint_suffix(self, column));
        }
        def
    }
}
