//! Running migrations as part of application startup.

use crate::builder::MigrationBuilder;
use crate::connector::Connector;
use crate::error::Error;
use crate::inspect::SchemaInspector;
use crate::report::MigrationReport;
use crate::runner::MigrationRunner;
use accrete_schema::{SchemaRegistry, SchemaSource, SchemaValidationError, TableSchema};

/// Whether startup migrations run, and against which tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MigrationMode {
    /// Never migrate; the caller owns the schema.
    #[default]
    Disabled,
    /// Migrate exactly these tables, in registry order.
    Enabled(SchemaRegistry),
}

impl MigrationMode {
    /// Migrate an explicit list of schemas.
    pub fn explicit(
        schemas: impl IntoIterator<Item = TableSchema>,
    ) -> Result<Self, SchemaValidationError> {
        Ok(MigrationMode::Enabled(SchemaRegistry::from_schemas(schemas)?))
    }

    /// Migrate whatever schemas `sources` expose, in iteration order.
    pub fn derived<'a, S>(
        sources: impl IntoIterator<Item = &'a S>,
    ) -> Result<Self, SchemaValidationError>
    where
        S: SchemaSource + ?Sized + 'a,
    {
        Ok(MigrationMode::Enabled(SchemaRegistry::from_sources(sources)?))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, MigrationMode::Enabled(_))
    }
}

/// Startup migration settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSettings {
    pub mode: MigrationMode,
    /// Report every outcome to the runner's sink.
    pub verbose: bool,
}

impl MigrationSettings {
    pub fn new(mode: MigrationMode) -> Self {
        Self {
            mode,
            verbose: false,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Run the configured migrations, if any.
///
/// Returns `Ok(None)` without touching the database when migrations are disabled.
pub async fn migrate_on_startup<C, I, B>(
    settings: &MigrationSettings,
    runner: &MigrationRunner<C, I, B>,
) -> Result<Option<MigrationReport>, Error>
where
    C: Connector,
    I: SchemaInspector,
    B: MigrationBuilder,
{
    let MigrationMode::Enabled(registry) = &settings.mode else {
        tracing::debug!("startup migrations disabled");
        return Ok(None);
    };

    let report = runner.run(&registry.schemas(), settings.verbose).await?;
    Ok(Some(report))
}
