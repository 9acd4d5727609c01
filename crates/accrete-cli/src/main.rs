use accrete::{
    Connector, Dialect, MigrationBuilder, MigrationMode, MigrationRunner, MigrationSettings,
    PgConnector, SchemaInspector, SchemaRegistry, SqliteConnector, TablePlan, TableSchema,
    migrate_on_startup,
};
use accrete_config::{Config, ConfigError};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::process::ExitCode;

mod console;

use console::ConsoleSink;

/// Additive, idempotent schema migrations for SQLite and Postgres.
#[derive(Parser, Debug)]
#[command(name = "accrete", version, about, long_about = None)]
struct Cli {
    /// Command to run
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create missing tables and columns
    Migrate {
        /// Database connection URL
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Print the DDL `migrate` would run, without running it
    Plan {
        /// Database connection URL
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Show which tables need migrating
    Status {
        /// Database connection URL
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Dump the declared schema
    Schema,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dialect(#[from] accrete::UnknownDialect),

    #[error("no database URL: pass --database-url, set database_url in the config, or set DATABASE_URL")]
    NoDatabaseUrl,

    #[error("no dialect in the config, and none recognizable from {url}")]
    NoDialect { url: String },

    #[error(transparent)]
    Connector(#[from] accrete::ConnectorError),

    #[error(transparent)]
    Inspection(#[from] accrete::InspectionError),

    #[error(transparent)]
    Migration(#[from] accrete::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let (config, config_path) = accrete_config::load()?;
    tracing::debug!(path = %config_path, "loaded config");
    let registry = config.registry()?;
    let schemas = registry.schemas();
    let settings = migration_settings(&config, registry);

    let database_url = match &cli.command {
        Commands::Schema => {
            print_schema(&schemas);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Migrate { database_url }
        | Commands::Plan { database_url }
        | Commands::Status { database_url } => database_url.clone(),
    };

    if matches!(cli.command, Commands::Migrate { .. }) && !settings.mode.is_enabled() {
        println!("Migrations are disabled in the config; nothing to do.");
        return Ok(ExitCode::SUCCESS);
    }

    let url = resolve_database_url(database_url, &config).ok_or(CliError::NoDatabaseUrl)?;
    let dialect = resolve_dialect(&config, &url)?;
    println!("accrete {} ({})", command_name(&cli.command), dialect);
    println!("  database: {}", mask_password(&url));
    println!();

    match dialect {
        Dialect::Sqlite => {
            let conn = SqliteConnector::connect(&url).await?;
            let runner = MigrationRunner::sqlite(conn).with_sink(ConsoleSink);
            execute(&cli.command, runner, &schemas, &settings).await
        }
        Dialect::Postgres => {
            let conn = PgConnector::connect(&url).await?;
            let runner = MigrationRunner::postgres(conn).with_sink(ConsoleSink);
            execute(&cli.command, runner, &schemas, &settings).await
        }
    }
}

async fn execute<C, I, B>(
    command: &Commands,
    runner: MigrationRunner<C, I, B>,
    schemas: &[TableSchema],
    settings: &MigrationSettings,
) -> Result<ExitCode, CliError>
where
    C: Connector,
    I: SchemaInspector,
    B: MigrationBuilder,
{
    let code = match command {
        Commands::Migrate { .. } => match migrate_on_startup(settings, &runner).await? {
            None => {
                println!("Migrations are disabled in the config; nothing to do.");
                ExitCode::SUCCESS
            }
            Some(report) => {
                if settings.verbose {
                    println!();
                    for sql in &report.statements {
                        println!("{}", sql.dimmed());
                    }
                }
                println!();
                if report.is_noop() {
                    println!("{}", "Schema is up to date.".green());
                } else {
                    println!("{} statement(s) executed.", report.statements.len());
                }
                if report.has_failures() {
                    println!(
                        "{}",
                        format!("{} table(s) could not be migrated.", report.failures().count())
                            .red()
                    );
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
        },
        Commands::Plan { .. } => {
            let plan = runner.plan(schemas).await?;
            if plan.is_noop() {
                println!("{}", "Schema is up to date.".green());
            } else {
                print!("{}", plan.to_sql());
            }
            let mut rejected = 0;
            for table in &plan.tables {
                if let TablePlan::Rejected { table, error } = table {
                    rejected += 1;
                    println!("{} {}: {}", "!".red(), table, error);
                }
            }
            if rejected > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::Status { .. } => {
            for schema in schemas {
                if runner.needs_migration(schema).await? {
                    println!("  {} {}", schema.name, "needs migration".yellow());
                } else {
                    println!("  {} {}", schema.name, "up to date".green());
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Schema => ExitCode::SUCCESS,
    };

    runner.into_connector().close().await?;
    Ok(code)
}

fn print_schema(schemas: &[TableSchema]) {
    if schemas.is_empty() {
        println!("No tables declared.");
        println!();
        println!("Declare tables under `tables` in {}.", accrete_config::CONFIG_PATH);
        return;
    }

    println!("Schema ({} tables):", schemas.len());
    println!();
    for table in schemas {
        println!("  {} ({} columns)", table.name, table.columns.len());
        for col in &table.columns {
            let mut attrs = Vec::new();
            if col.primary_key {
                attrs.push("PK".to_string());
            }
            if col.auto_increment {
                attrs.push("AUTO".to_string());
            }
            if col.unique {
                attrs.push("UNIQUE".to_string());
            }
            if !col.nullable {
                attrs.push("NOT NULL".to_string());
            }
            if let Some(default) = &col.default {
                attrs.push(format!("DEFAULT {}", default));
            }

            let attrs_str = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };

            println!("    {}: {}{}", col.name, col.column_type, attrs_str);
        }
        println!();
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Migrate { .. } => "migrate",
        Commands::Plan { .. } => "plan",
        Commands::Status { .. } => "status",
        Commands::Schema => "schema",
    }
}

/// Startup settings as the config file describes them.
fn migration_settings(config: &Config, registry: SchemaRegistry) -> MigrationSettings {
    if config.disabled {
        MigrationSettings::disabled()
    } else {
        MigrationSettings::new(MigrationMode::Enabled(registry)).verbose(config.verbose)
    }
}

/// The config's `dialect`, or else the URL scheme.
fn resolve_dialect(config: &Config, url: &str) -> Result<Dialect, CliError> {
    match &config.dialect {
        Some(name) => Ok(name.parse()?),
        None => Dialect::from_url(url).ok_or_else(|| CliError::NoDialect {
            url: mask_password(url),
        }),
    }
}

/// The flag wins over the config file, which wins over `DATABASE_URL`.
fn resolve_database_url(flag: Option<String>, config: &Config) -> Option<String> {
    flag.or_else(|| config.database_url.clone())
        .or_else(|| std::env::var("DATABASE_URL").ok())
}

/// Mask password in database URL for display
fn mask_password(url: &str) -> String {
    // Simple masking: replace password between :// and @
    if let Some(start) = url.find("://") {
        if let Some(at) = url.rfind('@').filter(|at| *at > start) {
            let prefix = &url[..start + 3];
            let suffix = &url[at..];
            if let Some(colon) = url[start + 3..at].find(':') {
                let user = &url[start + 3..start + 3 + colon];
                return format!("{}{}:***{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
