//! Errors raised by schema validation, instance construction and adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the factory, instances and file adapters.
#[derive(Debug, Error)]
pub enum TabError {
    /// The schema descriptor is internally inconsistent.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A mutation was attempted on a frozen instance.
    #[error("Immutability violation: cannot modify {table}.{field} on a frozen instance")]
    Immutable { table: String, field: String },

    /// Write refused because the destination already exists.
    #[error("Destination already exists: {} (pass allow_overwrite to replace it)", path.display())]
    DestinationExists { path: PathBuf },

    /// A table name a workbook cannot carry as a sheet name.
    #[error("Table '{table}' cannot be written as a sheet: {reason}")]
    SheetName { table: String, reason: String },

    /// A declared key or foreign-key field has no matching column in the source.
    #[error("Unable to resolve field {table} : {field}")]
    FieldResolution { table: String, field: String },

    /// An instance lacks a table the comparing schema declares.
    #[error("Table '{0}' is missing from the instance")]
    MissingTable(String),

    /// Raw data or a lookup named a table the schema does not declare.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A table was accessed through the wrong shape (keyed vs keyless).
    #[error("Table '{table}' is {actual}, expected {expected}")]
    TableShape {
        table: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A raw row lacks one of its table's primary-key fields.
    #[error("Row for table '{table}' is missing primary key field '{field}'")]
    MissingKeyField { table: String, field: String },

    /// Strict construction saw the same key twice with different values.
    #[error("Duplicate primary key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    /// A keyed lookup for mutation found no row.
    #[error("No row with primary key {key} in table '{table}'")]
    MissingKey { table: String, key: String },

    /// A positional row had the wrong number of values.
    #[error("Table '{table}' expects {expected} values per row, got {actual}")]
    Arity {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// A value could not be coerced to its field's declared type.
    #[error("Field {table}.{field}: expected {expected}, got '{value}'")]
    TypeMismatch {
        table: String,
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("{message}")]
    Source {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type TabResult<T> = std::result::Result<T, TabError>;

impl TabError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        TabError::Schema(message.into())
    }

    pub fn field_resolution(table: impl Into<String>, field: impl Into<String>) -> Self {
        TabError::FieldResolution {
            table: table.into(),
            field: field.into(),
        }
    }

    pub fn immutable(table: impl Into<String>, field: impl Into<String>) -> Self {
        TabError::Immutable {
            table: table.into(),
            field: field.into(),
        }
    }

    /// True for errors caused by a frozen instance rejecting a write.
    pub fn is_immutability_violation(&self) -> bool {
        matches!(self, TabError::Immutable { .. })
    }
}

impl From<anyhow::Error> for TabError {
    fn from(err: anyhow::Error) -> Self {
        TabError::Source {
            message: format!("{:#}", err),
            source: err,
        }
    }
}
