//! # datagrid-rs: filtering and sequenced loading for data grids
//!
//! The data core of an interactive table widget. It decides which rows are
//! visible and keeps remotely loaded data consistent when requests overlap.
//!
//! ## Architecture
//!
//! - **Filter**: A filter list of conditions and OR-groups plus per-column
//!   header filters, compiled into predicates and applied to row handles
//! - **Loader**: Remote loading through an injected transport, with every
//!   request numbered so that stale responses are dropped
//! - **Scripting**: Rhai-based filter conditions for configuration files
//! - **Model**: The traits the core uses to talk to a table, plus an
//!   in-memory implementation
//!
//! ## Configuration
//!
//! Grids are described by TOML or JSON files (see [`config::GridConfig`]).
//! Persisted filter state lives in the platform data directory under
//! `dev.hxyulin.datagrid-rs` unless configured otherwise.
//!
//! ## Example
//!
//! ```ignore
//! use datagrid_rs::{
//!     config::GridConfig,
//!     filter::OperatorRegistry,
//!     model::TableModel,
//!     scripting::ScriptEngine,
//! };
//! use std::sync::Arc;
//!
//! let config = GridConfig::load("grid.toml")?;
//! let mut store = config.build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())?;
//!
//! let table = TableModel::with_rows(serde_json::from_str(&std::fs::read_to_string("rows.json")?)?);
//! store.set_header_filter_value("name", "al".into())?;
//! let visible = store.filter(&table.rows());
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod scripting;
pub mod types;

// Re-export commonly used types
pub use config::GridConfig;
pub use error::{GridError, Result};
pub use filter::{FilterSpec, FilterStore, OperatorRegistry};
pub use loader::{LoadPipeline, RequestOutcome, Transport};
pub use model::TableModel;
pub use scripting::ScriptEngine;
pub use types::{InsertPosition, LoaderIndicator, Row, RowHandle, RowId};
