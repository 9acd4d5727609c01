use super::{SchemaInspector, catalog_query, single_bool, unexpected};
use crate::connector::{BoxFuture, Connector, Value};
use crate::error::InspectionError;
use accrete_schema::ExistingColumnInfo;

const TABLE_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)";

const TABLE_INFO_SQL: &str =
    "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid";

/// Inspects SQLite through `sqlite_master` and `pragma_table_info`.
///
/// `table_exists` compares names exactly, while SQLite refuses a new table
/// whose name differs from an existing one only in ASCII case.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteInspector;

impl SchemaInspector for SqliteInspector {
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
            let rows = catalog_query(conn, table, TABLE_INFO_SQL, &params).await?;

            // SQLite tables always have at least one column.
            if rows.is_empty() {
                return Err(InspectionError::TableNotFound {
                    table: table.to_string(),
                });
            }

            rows.iter()
                .map(|row| {
                    let name = row
                        .get(0)
                        .and_then(Value::as_str)
                        .ok_or_else(|| unexpected(table, TABLE_INFO_SQL, "column name"))?;
                    // Untyped columns report an empty type, or NULL on old versions.
                    let declared_type = row.get(1).and_then(Value::as_str).unwrap_or_default();
                    let not_null = row
                        .get(2)
                        .and_then(Value::as_bool)
                        .ok_or_else(|| unexpected(table, TABLE_INFO_SQL, "notnull flag"))?;
                    // pk is the 1-based position in the key, 0 when not part of it.
                    let pk = row
                        .get(3)
                        .and_then(Value::as_i64)
                        .ok_or_else(|| unexpected(table, TABLE_INFO_SQL, "pk position"))?;

                    Ok(ExistingColumnInfo {
                        name: name.to_string(),
                        declared_type: declared_type.to_string(),
                        nullable: !not_null && pk == 0,
                        primary_key: pk > 0,
                    })
                })
                .collect()
        })
    }
}
