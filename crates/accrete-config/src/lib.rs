//! Configuration file handling for accrete.
//!
//! Looks for `.config/accrete.styx` in the current directory or any parent
//! directory. The file optionally names the dialect and the database URL, and
//! declares the tables to migrate, in order.
//!
//! ```text
//! dialect sqlite
//! database_url "sqlite://app.db"
//! tables (
//!   {
//!     name users
//!     columns (
//!       {name id, type integer, pk true, auto_increment true}
//!       {name email, type text, nullable false, unique true}
//!     )
//!   }
//! )
//! ```

use accrete_schema::{
    ColumnDefinition, ColumnType, ParseColumnTypeError, Scalar, SchemaRegistry,
    SchemaValidationError, TableSchema,
};
use camino::{Utf8Path, Utf8PathBuf};
use facet::Facet;

/// Where the config file lives, relative to the project root.
pub const CONFIG_PATH: &str = ".config/accrete.styx";

/// Top-level configuration.
#[derive(Debug, Clone, Facet)]
pub struct Config {
    /// `sqlite` or `postgres`. Taken from the database URL's scheme when absent.
    #[facet(default)]
    pub dialect: Option<String>,

    /// Connection URL. Falls back to `DATABASE_URL` when absent.
    #[facet(default)]
    pub database_url: Option<String>,

    /// Never run migrations.
    #[facet(default)]
    pub disabled: bool,

    /// Print a line for every table and column handled.
    #[facet(default)]
    pub verbose: bool,

    /// Declared tables, migrated in this order.
    #[facet(default)]
    pub tables: Vec<TableDecl>,
}

/// A declared table.
#[derive(Debug, Clone, Facet)]
pub struct TableDecl {
    pub name: String,

    /// Columns in declared order.
    pub columns: Vec<ColumnDecl>,
}

/// A declared column.
#[derive(Debug, Clone, Facet)]
pub struct ColumnDecl {
    pub name: String,

    /// One of `integer`, `text`, `real`, `boolean`, `datetime`, `blob`.
    #[facet(rename = "type")]
    pub ty: String,

    #[facet(default)]
    pub pk: bool,

    #[facet(default)]
    pub auto_increment: bool,

    /// Defaults to true, except for primary keys.
    #[facet(default)]
    pub nullable: Option<bool>,

    #[facet(default)]
    pub unique: bool,

    /// A literal, parsed according to `type`: `42`, `1.5`, `true`,
    /// `2024-01-01T00:00:00Z`, or hex bytes for blobs.
    #[facet(default)]
    pub default: Option<String>,
}

impl Config {
    /// Convert every declared table, keeping file order.
    pub fn schemas(&self) -> Result<Vec<TableSchema>, ConfigError> {
        self.tables.iter().map(TableDecl::to_schema).collect()
    }

    /// The declared tables as a registry. Duplicate table names are rejected.
    pub fn registry(&self) -> Result<SchemaRegistry, ConfigError> {
        Ok(SchemaRegistry::from_schemas(self.schemas()?)?)
    }
}

impl TableDecl {
    pub fn to_schema(&self) -> Result<TableSchema, ConfigError> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.to_definition(&self.name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TableSchema::new(self.name.clone(), columns))
    }
}

impl ColumnDecl {
    pub fn to_definition(&self, table: &str) -> Result<ColumnDefinition, ConfigError> {
        let column_type: ColumnType =
            self.ty.parse().map_err(|source| ConfigError::ColumnType {
                table: table.to_string(),
                column: self.name.clone(),
                source,
            })?;

        let mut def = ColumnDefinition::new(self.name.clone(), column_type);
        if self.pk {
            def = def.primary_key();
        } else if self.nullable == Some(false) {
            def = def.not_null();
        }
        if self.auto_increment {
            def = def.auto_increment();
        }
        if self.unique {
            def = def.unique();
        }
        if let Some(raw) = &self.default {
            let value = parse_default(column_type, raw).map_err(|reason| ConfigError::Default {
                table: table.to_string(),
                column: self.name.clone(),
                value: raw.clone(),
                reason,
            })?;
            def = def.default_value(value);
        }
        Ok(def)
    }
}

/// Parse a default literal for a column of type `ty`.
pub fn parse_default(ty: ColumnType, raw: &str) -> Result<Scalar, String> {
    match ty {
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Scalar::Integer)
            .map_err(|e| e.to_string()),
        ColumnType::Real => raw
            .trim()
            .parse::<f64>()
            .map(Scalar::Real)
            .map_err(|e| e.to_string()),
        ColumnType::Text => Ok(Scalar::Text(raw.to_string())),
        ColumnType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Scalar::Boolean(true)),
            "false" | "0" => Ok(Scalar::Boolean(false)),
            _ => Err("expected true or false".to_string()),
        },
        ColumnType::DateTime => raw
            .trim()
            .parse::<jiff::Timestamp>()
            .map(Scalar::DateTime)
            .map_err(|e| e.to_string()),
        ColumnType::Blob => parse_hex(raw.trim()).map(Scalar::Blob),
    }
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, String> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("\\x"))
        .unwrap_or(raw);
    if digits.len() % 2 != 0 {
        return Err("hex bytes need an even number of digits".to_string());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .filter(|pair| pair.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex byte at offset {i}"))
        })
        .collect()
}

/// Load configuration from `.config/accrete.styx`, searching up the directory tree.
pub fn load() -> Result<(Config, Utf8PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: Utf8PathBuf::from("."),
        source,
    })?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| ConfigError::NonUtf8Path(e.into_path_buf()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Utf8Path) -> Result<(Config, Utf8PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let config = parse(&content).map_err(|message| ConfigError::Parse {
        path: config_path.clone(),
        message,
    })?;
    Ok((config, config_path))
}

/// Parse a config document.
pub fn parse(content: &str) -> Result<Config, String> {
    facet_styx::from_str(content).map_err(|e| e.to_string())
}

/// Find `.config/accrete.styx` by searching up the directory tree.
pub fn find_config_file(start: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_PATH);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {CONFIG_PATH} found in current directory or any parent")]
    NotFound,

    #[error("current directory is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(std::path::PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: Utf8PathBuf, message: String },

    #[error("table {table}, column {column}: {source}")]
    ColumnType {
        table: String,
        column: String,
        #[source]
        source: ParseColumnTypeError,
    },

    #[error("table {table}, column {column}: invalid default {value:?} ({reason})")]
    Default {
        table: String,
        column: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}
