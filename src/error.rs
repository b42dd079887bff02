//! Error handling for eventsel
//!
//! This module defines the error type shared by the configuration store, the
//! column binding layer, the record stream service and the stage lifecycle,
//! plus a Result alias for use throughout the crate.

use thiserror::Error;

/// Main error type for eventsel operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed steering input. No partial store is ever returned.
    #[error("Steering file line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    /// `get` was called with a type that does not match the stored field
    #[error("Config key '{key}' holds {found}, requested as {expected}")]
    ConfigTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A required configuration key is absent
    #[error("Missing config key '{0}'")]
    MissingKey(String),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// A column type descriptor has no allocation case
    #[error("Unsupported column type '{0}'")]
    BindingTypeUnsupported(String),

    /// The bound type differs from the type stored in the record stream
    #[error("Column '{column}' is stored as {stored}, bound as {requested}")]
    BindingTypeMismatch {
        column: String,
        stored: String,
        requested: String,
    },

    /// A slot's recorded type disagrees with its buffer at release time
    #[error("Cannot release column '{column}': recorded as {recorded}, buffer holds {actual}")]
    BindingReleaseUnmatched {
        column: String,
        recorded: String,
        actual: String,
    },

    /// A column is not present in the active record stream
    #[error("Column '{column}' not found in tree '{tree}'")]
    ColumnMissing { column: String, tree: String },

    /// A handle from a previous input file was used after release
    #[error("Stale handle for column '{0}'")]
    StaleColumn(String),

    /// Missing source, missing tree, double initialisation, bad stream index
    #[error("Stream configuration error: {0}")]
    StreamConfiguration(String),

    /// A selector name that is not in the registry
    #[error("Unknown selector '{0}'")]
    UnknownSelector(String),

    /// A lifecycle hook was called out of order
    #[error("Selector '{stage}' cannot {operation} while {state}")]
    InvalidTransition {
        stage: String,
        operation: &'static str,
        state: &'static str,
    },

    /// A lifecycle hook of a selector failed
    #[error("Selector '{stage}': {message}")]
    Stage { stage: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Serialization(err.to_string())
    }
}

/// Result type alias for eventsel operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
