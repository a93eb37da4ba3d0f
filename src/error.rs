//! Error types for the traffic ledger.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur during ledger operation.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A referenced driver, vehicle, license, citation, course or staff member is absent
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// Uniqueness violation on create
    #[error("{entity} '{key}' already exists")]
    AlreadyExists { entity: &'static str, key: String },

    /// Status change that violates a one-way lifecycle
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Malformed identifier, negative amount, unknown code
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Underlying SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Rules file could not be parsed
    #[error("Rules parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Rules file parsed but failed validation
    #[error("Invalid rules: {0}")]
    Config(String),

    /// A writer panicked while holding the ledger connection
    #[error("Ledger connection lock poisoned")]
    Poisoned,

    /// Missing input file argument
    #[error("Missing input file argument. Usage: traffic-ledger <operations.csv> [rules.toml]")]
    MissingArgument,
}

impl LedgerError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        LedgerError::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    /// Returns `true` for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    /// Returns `true` for `AlreadyExists`.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, LedgerError::AlreadyExists { .. })
    }

    /// Returns `true` for `InvalidTransition`.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, LedgerError::InvalidTransition { .. })
    }
}
