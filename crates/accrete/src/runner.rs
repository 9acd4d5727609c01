//! The migration runner.
//!
//! Brings a live database up to a list of declared schemas by creating
//! missing tables and adding missing columns, one table at a time, in the
//! order given. Existing structure is never dropped or altered; drift in
//! the type or nullability of an existing column is logged and left alone.

use crate::builder::{MigrationBuilder, PostgresBuilder, SqliteBuilder};
use crate::connector::Connector;
use crate::error::{BuildError, ConnectorError, Error, ExecutionError, InspectionError, MigrationError};
use crate::inspect::{PostgresInspector, SchemaInspector, SqliteInspector};
use crate::report::{MigrationReport, Outcome, ReportSink, TracingSink};
use crate::traced::ConnectorExt;
use accrete_schema::{ColumnDefinition, ExistingColumnInfo, SchemaValidationError, TableSchema};
use std::collections::HashSet;

/// What a pass would do to one table.
#[derive(Debug, Clone, PartialEq)]
pub enum TablePlan {
    /// The table is absent.
    Create { table: String, sql: String },
    /// The table exists but lacks some columns, listed in declared order.
    AddColumns {
        table: String,
        columns: Vec<(String, String)>,
    },
    /// The table already matches.
    NoChange { table: String },
    /// The declaration can't be applied; nothing will be executed for it.
    Rejected { table: String, error: BuildError },
}

impl TablePlan {
    pub fn table(&self) -> &str {
        match self {
            TablePlan::Create { table, .. }
            | TablePlan::AddColumns { table, .. }
            | TablePlan::NoChange { table }
            | TablePlan::Rejected { table, .. } => table,
        }
    }

    /// The DDL this plan would execute, in order.
    pub fn statements(&self) -> Vec<&str> {
        match self {
            TablePlan::Create { sql, .. } => vec![sql.as_str()],
            TablePlan::AddColumns { columns, .. } => {
                columns.iter().map(|(_, sql)| sql.as_str()).collect()
            }
            TablePlan::NoChange { .. } | TablePlan::Rejected { .. } => Vec::new(),
        }
    }
}

/// A dry run: the DDL a pass would issue, without issuing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub tables: Vec<TablePlan>,
}

impl MigrationPlan {
    /// Returns true if a pass would execute nothing.
    pub fn is_noop(&self) -> bool {
        self.tables.iter().all(|t| t.statements().is_empty())
    }

    pub fn statement_count(&self) -> usize {
        self.tables.iter().map(|t| t.statements().len()).sum()
    }

    /// All planned DDL as a script, grouped by table.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for table in &self.tables {
            let statements = table.statements();
            if statements.is_empty() {
                continue;
            }
            sql.push_str(&format!("-- Table: {}\n", table.table()));
            for stmt in statements {
                sql.push_str(stmt);
                sql.push('\n');
            }
            sql.push('\n');
        }
        sql
    }
}

/// Runs inspection and DDL for one dialect over one connection.
///
/// The inspector and builder are picked when the runner is built; use
/// [`MigrationRunner::sqlite`] or [`MigrationRunner::postgres`] for the
/// stock pairs.
pub struct MigrationRunner<C, I, B> {
    conn: C,
    inspector: I,
    builder: B,
    sink: Box<dyn ReportSink>,
}

impl<C: Connector> MigrationRunner<C, SqliteInspector, SqliteBuilder> {
    pub fn sqlite(conn: C) -> Self {
        Self::new(conn, SqliteInspector, SqliteBuilder)
    }
}

impl<C: Connector> MigrationRunner<C, PostgresInspector, PostgresBuilder> {
    pub fn postgres(conn: C) -> Self {
        Self::new(conn, PostgresInspector, PostgresBuilder)
    }
}

impl<C, I, B> MigrationRunner<C, I, B>
where
    C: Connector,
    I: SchemaInspector,
    B: MigrationBuilder,
{
    pub fn new(conn: C, inspector: I, builder: B) -> Self {
        Self {
            conn,
            inspector,
            builder,
            sink: Box::new(TracingSink),
        }
    }

    /// Send verbose progress lines somewhere other than `tracing`.
    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn connector(&self) -> &C {
        &self.conn
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn into_connector(self) -> C {
        self.conn
    }

    /// Whether the table is absent or lacks any declared column. Read-only.
    pub async fn needs_migration(&self, schema: &TableSchema) -> Result<bool, InspectionError> {
        let conn = self.conn.traced();
        if !self.inspector.table_exists(&conn, &schema.name).await? {
            return Ok(true);
        }
        let existing = self.inspector.list_columns(&conn, &schema.name).await?;
        Ok(!missing_from(schema, &existing).is_empty())
    }

    /// Declared columns the existing table doesn't have, in declared order.
    ///
    /// Names compare case-insensitively. Empty when the table itself is
    /// absent; ask [`SchemaInspector::table_exists`] to tell the two apart.
    pub async fn missing_columns(
        &self,
        schema: &TableSchema,
    ) -> Result<Vec<ColumnDefinition>, InspectionError> {
        let conn = self.conn.traced();
        if !self.inspector.table_exists(&conn, &schema.name).await? {
            return Ok(Vec::new());
        }
        let existing = self.inspector.list_columns(&conn, &schema.name).await?;
        Ok(missing_from(schema, &existing).into_iter().cloned().collect())
    }

    /// Work out what [`run`](Self::run) would do, without executing anything.
    pub async fn plan(&self, schemas: &[TableSchema]) -> Result<MigrationPlan, Error> {
        self.ensure_connected()?;

        let mut seen = HashSet::new();
        let mut plan = MigrationPlan::default();
        for schema in schemas {
            plan.tables.push(self.plan_table(schema, &mut seen).await?);
        }
        Ok(plan)
    }

    /// Bring every schema up to date, in the given order.
    ///
    /// A table that can't be migrated is recorded as [`Outcome::Failed`] and
    /// the pass moves on. Catalog failures and a lost connection abort the
    /// whole pass.
    pub async fn run(&self, schemas: &[TableSchema], verbose: bool) -> Result<MigrationReport, Error> {
        self.ensure_connected()?;

        let mut seen = HashSet::new();
        let mut report = MigrationReport::default();
        for schema in schemas {
            let plan = self.plan_table(schema, &mut seen).await?;
            self.apply(plan, &mut report, verbose).await?;
        }

        tracing::info!(
            dialect = %self.builder.dialect(),
            tables = schemas.len(),
            statements = report.statements.len(),
            failures = report.failures().count(),
            "migration pass finished"
        );
        Ok(report)
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.conn.is_connected() {
            Ok(())
        } else {
            Err(ConnectorError::NotConnected.into())
        }
    }

    async fn plan_table<'s>(
        &self,
        schema: &'s TableSchema,
        seen: &mut HashSet<&'s str>,
    ) -> Result<TablePlan, InspectionError> {
        let table = schema.name.clone();
        let rejected = |error: BuildError| TablePlan::Rejected {
            table: schema.name.clone(),
            error,
        };

        // Validation comes first so an invalid declaration never reaches the catalog.
        if let Err(e) = schema.validate() {
            return Ok(rejected(e.into()));
        }
        if !seen.insert(schema.name.as_str()) {
            return Ok(rejected(
                SchemaValidationError::DuplicateTable { table }.into(),
            ));
        }

        let conn = self.conn.traced();
        if !self.inspector.table_exists(&conn, &schema.name).await? {
            return Ok(match self.builder.build_create_table(schema) {
                Ok(sql) => TablePlan::Create { table, sql },
                Err(e) => rejected(e.into()),
            });
        }

        let existing = self.inspector.list_columns(&conn, &schema.name).await?;
        self.warn_on_drift(schema, &existing);

        let missing = missing_from(schema, &existing);
        if missing.is_empty() {
            return Ok(TablePlan::NoChange { table });
        }

        // All or nothing: a table is never left with only some of its new columns
        // because one of them can't be expressed.
        let mut columns = Vec::with_capacity(missing.len());
        for column in missing {
            match self.builder.build_add_column(&schema.name, column) {
                Ok(sql) => columns.push((column.name.clone(), sql)),
                Err(e) => return Ok(rejected(e)),
            }
        }
        Ok(TablePlan::AddColumns { table, columns })
    }

    async fn apply(
        &self,
        plan: TablePlan,
        report: &mut MigrationReport,
        verbose: bool,
    ) -> Result<(), Error> {
        match plan {
            TablePlan::Create { table, sql } => match self.execute(&table, &sql).await? {
                Ok(()) => {
                    tracing::info!(%table, "created table");
                    report.statements.push(sql);
                    self.record(report, Outcome::TableCreated { table }, verbose);
                }
                Err(error) => {
                    self.record(report, failed(table, None, error.into()), verbose);
                }
            },
            TablePlan::AddColumns { table, columns } => {
                for (column, sql) in columns {
                    match self.execute(&table, &sql).await? {
                        Ok(()) => {
                            tracing::info!(%table, %column, "added column");
                            report.statements.push(sql);
                            let outcome = Outcome::ColumnAdded {
                                table: table.clone(),
                                column,
                            };
                            self.record(report, outcome, verbose);
                        }
                        Err(error) => {
                            // The rest of this table's columns are skipped.
                            let outcome = failed(table.clone(), Some(column), error.into());
                            self.record(report, outcome, verbose);
                            break;
                        }
                    }
                }
            }
            TablePlan::NoChange { table } => {
                self.record(report, Outcome::NoChange { table }, verbose);
            }
            TablePlan::Rejected { table, error } => {
                let column = match &error {
                    BuildError::Unsupported(e) => Some(e.column.clone()),
                    BuildError::Validation(_) => None,
                };
                self.record(report, failed(table, column, error.into()), verbose);
            }
        }
        Ok(())
    }

    /// Execute one DDL statement. The outer error is a lost connection, which
    /// ends the pass; the inner one is the database refusing the statement.
    async fn execute(&self, table: &str, sql: &str) -> Result<Result<(), ExecutionError>, Error> {
        match self.conn.traced().execute(sql, &[]).await {
            Ok(_) => Ok(Ok(())),
            Err(ConnectorError::NotConnected) => Err(ConnectorError::NotConnected.into()),
            Err(source) => Ok(Err(ExecutionError {
                table: table.to_string(),
                sql: sql.to_string(),
                source,
            })),
        }
    }

    fn record(&self, report: &mut MigrationReport, outcome: Outcome, verbose: bool) {
        if let Outcome::Failed { table, error, .. } = &outcome {
            tracing::error!(%table, "{}", error);
        }
        if verbose {
            self.sink.report(&outcome);
        }
        report.outcomes.push(outcome);
    }

    fn warn_on_drift(&self, schema: &TableSchema, existing: &[ExistingColumnInfo]) {
        for column in &schema.columns {
            let Some(actual) = existing
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(&column.name))
            else {
                continue;
            };

            if !self
                .builder
                .declared_type_matches(column.column_type, &actual.declared_type)
            {
                tracing::warn!(
                    table = %schema.name,
                    column = %column.name,
                    declared = %column.column_type,
                    expected = self.builder.map_type(column.column_type),
                    actual = %actual.declared_type,
                    "existing column has a different type; leaving it unchanged"
                );
            }
            if !column.primary_key && !actual.primary_key && column.nullable != actual.nullable {
                tracing::warn!(
                    table = %schema.name,
                    column = %column.name,
                    declared_nullable = column.nullable,
                    actual_nullable = actual.nullable,
                    "existing column has different nullability; leaving it unchanged"
                );
            }
        }
    }
}

fn failed(table: String, column: Option<String>, error: MigrationError) -> Outcome {
    Outcome::Failed {
        table,
        column,
        error,
    }
}

/// Declared columns with no match among `existing`. Only ASCII letters fold,
/// the same as SQLite's own identifier matching.
fn missing_from<'s>(schema: &'s TableSchema, existing: &[ExistingColumnInfo]) -> Vec<&'s ColumnDefinition> {
    let present: HashSet<String> = existing.iter().map(|c| c.name.to_ascii_lowercase()).collect();
    schema
        .columns
        .iter()
        .filter(|c| !present.contains(&c.name.to_ascii_lowercase()))
        .collect()
}
