//! Configuration module for datagrid-rs
//!
//! A grid configuration file describes the columns, the initial filters and
//! the remote loading options of one table. Files are TOML or JSON, chosen
//! by extension.
//!
//! # App Data Location
//!
//! Persisted filter state is stored in the platform-appropriate location
//! unless a path is configured:
//! - **Linux**: `~/.local/share/dev.hxyulin.datagrid-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.datagrid-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.datagrid-rs\`
//!
//! # Example
//!
//! ```toml
//! [ajax]
//! url = "https://example.com/people"
//! params = { dept = "eng" }
//!
//! [[columns]]
//! field = "name"
//! title = "Name"
//! header_filter = { editor = "input" }
//!
//! [[filters]]
//! field = "age"
//! type = ">="
//! value = 30
//! ```

pub mod persistence;
pub mod settings;

pub use persistence::JsonFilePersistence;
pub use settings::*;

use crate::error::{GridError, Result};
use crate::filter::{FilterCompiler, FilterSpec, FilterStore, OperatorRegistry};
use crate::loader::{LoadPipeline, Paginator};
use crate::model::ColumnSet;
use crate::scripting::ScriptEngine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.datagrid-rs";

/// Persisted filter state filename
pub const FILTER_STATE_FILE: &str = "filters.json";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the persisted filter state
pub fn filter_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(FILTER_STATE_FILE))
}

// ==================== Grid Config ====================

/// Complete configuration of one grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub filter: FilterSettings,
    pub ajax: AjaxSettings,
    pub pagination: PaginationSettings,
    pub columns: Vec<ColumnConfig>,
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

impl GridConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        match Format::of(path) {
            Format::Json => Ok(serde_json::from_str(&content)?),
            Format::Toml => Ok(toml::from_str(&content)?),
        }
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load grid config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk, format chosen by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GridError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match Format::of(path) {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| GridError::Config(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content).map_err(|e| {
            GridError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Column definitions for the configured columns
    pub fn column_set(&self) -> ColumnSet {
        ColumnSet::new(self.columns.iter().map(ColumnConfig::to_column))
    }

    /// Initial filters as specs. Entries that fail to build are logged and
    /// skipped.
    pub fn filter_specs(&self, scripts: &ScriptEngine) -> Vec<FilterSpec> {
        self.filters
            .iter()
            .filter_map(|filter| match filter.to_spec(scripts) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    tracing::warn!("Skipping configured filter: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Configure a pipeline for remote loading: request settings, the
    /// progressive loader, and the first page's params when the data is
    /// paged. A progressive mode is dropped, with an error logged, when
    /// pagination is also enabled.
    pub fn apply_loading(&self, pipeline: &mut LoadPipeline, paginator: Arc<dyn Paginator>) {
        self.ajax.apply(pipeline);
        pipeline.set_progressive(
            self.ajax.progressive,
            self.pagination.enabled,
            paginator,
            self.ajax.progressive_scroll_margin,
        );
        if self.pagination.enabled || pipeline.progressive().is_some() {
            pipeline.set_params(self.pagination.page_params(1), true);
        }
    }

    /// Build a filter store with the configured columns, header filters,
    /// initial filters and persistence. With persistence enabled the
    /// initial filter list is saved straight away.
    pub fn build_store(
        &self,
        registry: Arc<OperatorRegistry>,
        scripts: &ScriptEngine,
    ) -> Result<FilterStore> {
        let columns = Arc::new(self.column_set());
        let compiler = FilterCompiler::new(registry, columns.clone());
        let mut store =
            FilterStore::new(compiler).with_remote_filtering(self.filter.remote_filtering);

        if self.filter.persistent {
            let persistence = match &self.filter.persistence_path {
                Some(path) => JsonFilePersistence::new(path.clone()),
                None => JsonFilePersistence::default_location().ok_or_else(|| {
                    GridError::Config("Could not determine filter state path".to_string())
                })?,
            };
            store = store.with_persistence(Arc::new(persistence));
        }

        store.initialize_columns(columns.iter().map(|c| c.as_ref()));
        store.add_filter(self.filter_specs(scripts));
        store.has_changed();
        Ok(store)
    }

    /// Sample configuration used by `datagrid init`
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.ajax.url = Some("https://example.com/api/people".to_string());
        config.ajax.params = serde_json::json!({ "dept": "eng" });
        config.columns = vec![
            ColumnConfig {
                header_filter: Some(HeaderFilterConfig::default()),
                ..ColumnConfig::new("name", "Name")
            },
            ColumnConfig::new("age", "Age"),
            ColumnConfig {
                header_filter: Some(HeaderFilterConfig {
                    editor: crate::filter::EditorKind::Select,
                    func: None,
                }),
                ..ColumnConfig::new("dept", "Department")
            },
        ];
        config.filters = vec![FilterConfig::Condition {
            field: "age".to_string(),
            operator: ">=".to_string(),
            value: serde_json::json!(18),
        }];
        config
    }
}
