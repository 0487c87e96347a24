//! Error handling for datagrid-rs
//!
//! This module defines the crate-level error type and a Result alias. The
//! filter and loader subsystems keep their own narrower error enums and
//! convert into [`GridError`] at the crate boundary.

use crate::filter::FilterError;
use crate::loader::TransportError;
use thiserror::Error;

/// Main error type for datagrid-rs operations
#[derive(Error, Debug)]
pub enum GridError {
    /// Errors raised while compiling or managing filters
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Errors raised by an injected transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Errors related to Rhai script compilation or execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GridError>,
    },
}

impl GridError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        GridError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        GridError::Script(err.to_string())
    }
}

/// Result type alias for datagrid-rs operations
pub type Result<T> = std::result::Result<T, GridError>;

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

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| GridError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| GridError::from_rhai_error(e).with_context(f()))
    }
}
