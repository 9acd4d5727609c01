//! Colored terminal output.

use accrete::{Outcome, ReportSink};
use owo_colors::OwoColorize;

/// Prints each outcome on its own line, colored by what happened.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn report(&self, outcome: &Outcome) {
        let line = outcome.to_string();
        match outcome {
            Outcome::TableCreated { .. } | Outcome::ColumnAdded { .. } => {
                println!("  {}", line.green())
            }
            Outcome::NoChange { .. } => println!("  {}", line.dimmed()),
            Outcome::Failed { .. } => println!("  {}", line.red()),
        }
    }
}
