//! What a migration pass did, table by table.

use crate::error::MigrationError;
use std::sync::{Arc, Mutex};

/// The result of migrating one declared table (or one of its columns).
#[derive(Debug)]
pub enum Outcome {
    /// The table was absent and has been created.
    TableCreated { table: String },
    /// The column was absent from an existing table and has been added.
    ColumnAdded { table: String, column: String },
    /// The table already had every declared column.
    NoChange { table: String },
    /// Nothing (more) was applied to this table.
    Failed {
        table: String,
        column: Option<String>,
        error: MigrationError,
    },
}

impl Outcome {
    pub fn table(&self) -> &str {
        match self {
            Outcome::TableCreated { table }
            | Outcome::ColumnAdded { table, .. }
            | Outcome::NoChange { table }
            | Outcome::Failed { table, .. } => table,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::TableCreated { table } => write!(f, "+ table {}", table),
            Outcome::ColumnAdded { table, column } => write!(f, "+ {}.{}", table, column),
            Outcome::NoChange { table } => write!(f, "= table {}", table),
            Outcome::Failed {
                table,
                column: Some(column),
                error,
            } => write!(f, "! {}.{}: {}", table, column, error),
            Outcome::Failed {
                table,
                column: None,
                error,
            } => write!(f, "! table {}: {}", table, error),
        }
    }
}

/// Every outcome of a pass, in the order they happened, plus the DDL that
/// was actually executed.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub outcomes: Vec<Outcome>,
    pub statements: Vec<String>,
}

impl MigrationReport {
    /// Nothing was executed and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.statements.is_empty() && !self.has_failures()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn created_tables(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::TableCreated { table } => Some(table.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `(table, column)` pairs, in the order they were added.
    pub fn added_columns(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::ColumnAdded { table, column } => Some((table.as_str(), column.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Where verbose progress lines go.
pub trait ReportSink: Send + Sync {
    fn report(&self, outcome: &Outcome);
}

/// Sends progress lines to `tracing`. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, outcome: &Outcome) {
        if outcome.is_failure() {
            tracing::error!(table = %outcome.table(), "{}", outcome);
        } else {
            tracing::info!(table = %outcome.table(), "{}", outcome);
        }
    }
}

/// Keeps progress lines in memory.
///
/// Clones share the same buffer, so hand one to the runner and keep the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ReportSink for MemorySink {
    fn report(&self, outcome: &Outcome) {
        let line = outcome.to_string();
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn report(&self, outcome: &Outcome) {
        (**self).report(outcome)
    }
}
