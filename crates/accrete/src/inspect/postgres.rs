use super::{SchemaInspector, catalog_query, single_bool, unexpected};
use crate::connector::{BoxFuture, Connector, Value};
use crate::error::InspectionError;
use accrete_schema::ExistingColumnInfo;

const TABLE_EXISTS_SQL: &str = "SELECT EXISTS (
    SELECT 1
    FROM information_schema.tables
    WHERE table_schema = current_schema()
      AND table_name::text = $1
)";

const COLUMNS_SQL: &str = "SELECT
    c.column_name::text,
    c.data_type::text,
    c.is_nullable::text = 'YES',
    EXISTS (
        SELECT 1
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_schema = tc.constraint_schema
         AND kcu.constraint_name = tc.constraint_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
          AND tc.table_schema = c.table_schema
          AND tc.table_name = c.table_name
          AND kcu.column_name = c.column_name
    )
FROM information_schema.columns c
WHERE c.table_schema = current_schema()
  AND c.table_name::text = $1
ORDER BY c.ordinal_position";

/// Inspects Postgres through `information_schema`, scoped to the current schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresInspector;

impl SchemaInspector for PostgresInspector {
    fn table_exists<'a, C: Connector + ?Sized>(
        &'a self,
        conn: &'a C,
        table: &'a str,
    ) -> BoxFuture<'a, Result<bool, InspectionError>> {
        Box::pin(async move {
            let params = [Value::from(table)];
            let rows = catalog_query(conn, table, TABLE_EXISTS_SQL, &params).await?;
            single_bool(&rows, table, TABLE_EXISTS_SQL)
        })
    }

    fn list_columns<'a, C: Connector + ?Sized>(
        &'a self,
        conn: &'a C,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ExistingColumnInfo>, InspectionError>> {
        Box::pin(async move {
            let params = [Value::from(table)];
            let rows = catalog_query(conn, table, COLUMNS_SQL, &params).await?;

            // Postgres allows zero-column tables, so an empty result is
            // ambiguous until we ask whether the table is there at all.
            if rows.is_empty() {
                return if self.table_exists(conn, table).await? {
                    Ok(Vec::new())
                } else {
                    Err(InspectionError::TableNotFound {
                        table: table.to_string(),
                    })
                };
            }

            rows.iter()
                .map(|row| {
                    let text = |idx: usize, what: &str| {
                        row.get(idx)
                            .and_then(Value::as_str)
                            .ok_or_else(|| unexpected(table, COLUMNS_SQL, what))
                    };
                    let flag = |idx: usize, what: &str| {
                        row.get(idx)
                            .and_then(Value::as_bool)
                            .ok_or_else(|| unexpected(table, COLUMNS_SQL, what))
                    };

                    Ok(ExistingColumnInfo {
                        name: text(0, "column name")?.to_string(),
                        declared_type: text(1, "data type")?.to_string(),
                        nullable: flag(2, "nullability")?,
                        primary_key: flag(3, "primary key flag")?,
                    })
                })
                .collect()
        })
    }
}
