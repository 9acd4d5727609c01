//! Declared table schema types for accrete.
//!
//! These are the values a caller hands to the migration runner: what each
//! table *should* look like. They carry no behavior beyond validation, and
//! nothing in accrete mutates them once built.
//!
//! ```
//! use accrete_schema::{ColumnDefinition, ColumnType, TableSchema};
//!
//! let users = TableSchema::new(
//!     "users",
//!     vec![
//!         ColumnDefinition::new("id", ColumnType::Integer).primary_key().auto_increment(),
//!         ColumnDefinition::new("name", ColumnType::Text).not_null(),
//!         ColumnDefinition::new("email", ColumnType::Text).not_null().unique(),
//!     ],
//! );
//! assert!(users.validate().is_ok());
//! ```

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

mod error;
pub use error::{ParseColumnTypeError, SchemaValidationError};

/// Portable column types.
///
/// How each one is stored is up to the dialect's migration builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
    /// Stored as 0/1 where the database has no native boolean.
    Boolean,
    /// Stored as ISO-8601 text where the database has no native timestamp.
    DateTime,
    Blob,
}

impl ColumnType {
    /// Every column type, in declaration order.
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Integer,
        ColumnType::Text,
        ColumnType::Real,
        ColumnType::Boolean,
        ColumnType::DateTime,
        ColumnType::Blob,
    ];

    /// The lowercase name used in config files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Blob => "blob",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ParseColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(ColumnType::Integer),
            "text" | "string" => Ok(ColumnType::Text),
            "real" | "float" => Ok(ColumnType::Real),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "datetime" | "timestamp" => Ok(ColumnType::DateTime),
            "blob" | "bytes" => Ok(ColumnType::Blob),
            _ => Err(ParseColumnTypeError(s.to_string())),
        }
    }
}

/// A scalar default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    DateTime(jiff::Timestamp),
    Blob(Vec<u8>),
}

impl Scalar {
    /// Whether this value can be stored in a column of type `ty`.
    ///
    /// Integers are accepted for real columns. Non-finite reals are never
    /// accepted, since no dialect can spell them as a literal.
    pub fn is_compatible_with(&self, ty: ColumnType) -> bool {
        match (self, ty) {
            (Scalar::Integer(_), ColumnType::Integer | ColumnType::Real) => true,
            (Scalar::Real(v), ColumnType::Real) => v.is_finite(),
            (Scalar::Text(_), ColumnType::Text) => true,
            (Scalar::Boolean(_), ColumnType::Boolean) => true,
            (Scalar::DateTime(_), ColumnType::DateTime) => true,
            (Scalar::Blob(_), ColumnType::Blob) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Real(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v:?}"),
            Scalar::Boolean(v) => write!(f, "{v}"),
            Scalar::DateTime(v) => write!(f, "{v}"),
            Scalar::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<jiff::Timestamp> for Scalar {
    fn from(v: jiff::Timestamp) -> Self {
        Scalar::DateTime(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Blob(v)
    }
}

/// One column's declared contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name, unique within its table.
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    /// Only meaningful for an integer primary key.
    pub auto_increment: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<Scalar>,
}

impl ColumnDefinition {
    /// A nullable, non-unique, non-key column with no default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            auto_increment: false,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    /// Mark as the primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Check the invariants that only involve this column.
    ///
    /// `table` is only used to give errors context.
    pub fn validate(&self, table: &str) -> Result<(), SchemaValidationError> {
        if self.name.trim().is_empty() {
            return Err(SchemaValidationError::EmptyColumnName {
                table: table.to_string(),
            });
        }

        if self.auto_increment {
            if !self.primary_key {
                return Err(SchemaValidationError::AutoIncrementWithoutPrimaryKey {
                    table: table.to_string(),
                    column: self.name.clone(),
                });
            }
            if self.column_type != ColumnType::Integer {
                return Err(SchemaValidationError::AutoIncrementNotInteger {
                    table: table.to_string(),
                    column: self.name.clone(),
                    column_type: self.column_type,
                });
            }
        }

        if let Some(default) = &self.default {
            if !default.is_compatible_with(self.column_type) {
                return Err(SchemaValidationError::IncompatibleDefault {
                    table: table.to_string(),
                    column: self.name.clone(),
                    column_type: self.column_type,
                    default: default.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// One table's declared contract.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Physical table name.
    pub name: String,
    /// Columns in declared order.
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Check every table-level and column-level invariant.
    ///
    /// Column names that differ only in ASCII case count as duplicates; they
    /// would collide once created.
    pub fn validate(&self) -> Result<(), SchemaValidationError> {
        if self.name.trim().is_empty() {
            return Err(SchemaValidationError::EmptyTableName);
        }

        if self.columns.is_empty() {
            return Err(SchemaValidationError::NoColumns {
                table: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            column.validate(&self.name)?;
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(SchemaValidationError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        let pk_columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        if pk_columns.len() > 1 {
            return Err(SchemaValidationError::MultiplePrimaryKeys {
                table: self.name.clone(),
                columns: pk_columns,
            });
        }

        Ok(())
    }
}

/// What the database catalog reports for an existing column.
///
/// Looser than [`ColumnDefinition`]: it describes whatever is actually there,
/// including columns accrete did not create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingColumnInfo {
    pub name: String,
    /// The raw type string from the catalog (e.g. `INTEGER`, `double precision`).
    pub declared_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Something that may carry a table schema.
///
/// Higher-level resource types implement this so a registry can be derived
/// from them instead of listed by hand.
pub trait SchemaSource {
    fn table_schema(&self) -> Option<TableSchema>;
}

impl SchemaSource for TableSchema {
    fn table_schema(&self) -> Option<TableSchema> {
        Some(self.clone())
    }
}

/// An ordered set of declared tables, keyed by table name.
///
/// Passed explicitly to whoever runs migrations; insertion order is the order
/// tables get migrated in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    tables: IndexMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from schemas, keeping their order.
    pub fn from_schemas(
        schemas: impl IntoIterator<Item = TableSchema>,
    ) -> Result<Self, SchemaValidationError> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Collect the schemas exposed by `sources`, in iteration order.
    /// Sources without a schema are skipped.
    pub fn from_sources<'a, S>(
        sources: impl IntoIterator<Item = &'a S>,
    ) -> Result<Self, SchemaValidationError>
    where
        S: SchemaSource + ?Sized + 'a,
    {
        Self::from_schemas(sources.into_iter().filter_map(|s| s.table_schema()))
    }

    /// Append a schema. Fails if a table with the same name is already registered.
    pub fn register(&mut self, schema: TableSchema) -> Result<(), SchemaValidationError> {
        if self.tables.contains_key(&schema.name) {
            return Err(SchemaValidationError::DuplicateTable { table: schema.name });
        }
        self.tables.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// The registered schemas, in registration order.
    pub fn schemas(&self) -> Vec<TableSchema> {
        self.tables.values().cloned().collect()
    }
}
