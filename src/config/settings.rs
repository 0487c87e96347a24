//! Serializable settings sections of a grid configuration file
//!
//! # Main Types
//!
//! - [`FilterSettings`] - Local vs remote filtering and persistence
//! - [`AjaxSettings`] - Url, params and request options for remote loading
//! - [`PaginationSettings`] - Page-based loading
//! - [`ColumnConfig`] - Column fields, titles and header filters
//! - [`FilterConfig`] - Initial filters, including script filters

use crate::error::{GridError, Result};
use crate::filter::{EditorKind, FilterSpec, HeaderFilterDefinition};
use crate::loader::{LoadPipeline, ProgressiveMode, RequestConfig, DEFAULT_ERROR_DISPLAY};
use crate::model::ColumnDefinition;
use crate::scripting::ScriptEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Filtering behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Leave filtering to the server; rows pass through locally
    pub remote_filtering: bool,

    /// Save the filter list after every change
    pub persistent: bool,

    /// Where to save it (defaults to the app data directory)
    pub persistence_path: Option<PathBuf>,
}

/// Remote loading options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AjaxSettings {
    pub url: Option<String>,

    /// Request method, GET unless set
    pub method: String,

    /// Extra request headers merged over the defaults
    pub headers: BTreeMap<String, String>,

    /// Request parameters
    pub params: Value,

    /// Show the loading indicator for non-silent requests
    pub show_loader: bool,

    /// How long the error indicator stays visible, in milliseconds
    pub error_display_ms: u64,

    /// Load data page by page
    pub progressive: Option<ProgressiveMode>,

    /// Scroll distance that triggers the next page in scroll mode
    pub progressive_scroll_margin: Option<f64>,
}

impl Default for AjaxSettings {
    fn default() -> Self {
        Self {
            url: None,
            method: crate::loader::DEFAULT_METHOD.to_string(),
            headers: BTreeMap::new(),
            params: Value::Object(Default::default()),
            show_loader: true,
            error_display_ms: DEFAULT_ERROR_DISPLAY.as_millis() as u64,
            progressive: None,
            progressive_scroll_margin: None,
        }
    }
}

impl AjaxSettings {
    pub fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::default().with_method(self.method.clone());
        config.headers.extend(self.headers.clone());
        config
    }

    /// Push these settings into a pipeline.
    pub fn apply(&self, pipeline: &mut LoadPipeline) {
        if let Some(url) = &self.url {
            pipeline.set_url(url.clone());
        }
        pipeline.set_params(self.params.clone(), false);
        pipeline.set_config(self.request_config());
        pipeline.set_show_loader(self.show_loader);
        pipeline.set_error_display(Duration::from_millis(self.error_display_ms));
    }
}

/// Page-based loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub enabled: bool,

    /// Rows per page, sent as `size` with every paged request
    pub page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            page_size: 20,
        }
    }
}

impl PaginationSettings {
    /// Request params selecting one page.
    pub fn page_params(&self, page: u32) -> Value {
        serde_json::json!({ "page": page, "size": self.page_size })
    }
}

/// A column's header filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderFilterConfig {
    pub editor: EditorKind,

    /// Name of a registered operator to use instead of the editor default
    pub func: Option<String>,
}

impl HeaderFilterConfig {
    pub fn definition(&self) -> HeaderFilterDefinition {
        let definition = HeaderFilterDefinition::new(self.editor);
        match &self.func {
            Some(name) => definition.with_operator(name.clone()),
            None => definition,
        }
    }
}

/// A table column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub field: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_filter: Option<HeaderFilterConfig>,
}

impl ColumnConfig {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            header_filter: None,
        }
    }

    pub fn to_column(&self) -> ColumnDefinition {
        let column = ColumnDefinition::new(self.field.clone(), self.title.clone());
        match &self.header_filter {
            Some(header) => column.with_header_filter(header.definition()),
            None => column,
        }
    }
}

/// An initial filter entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterConfig {
    /// `{ field, type, value }`
    Condition {
        field: String,
        #[serde(rename = "type")]
        operator: String,
        #[serde(default)]
        value: Value,
    },
    /// `{ script, params }`, a Rhai predicate
    Script {
        script: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        params: Value,
    },
    /// OR-group
    Group(Vec<FilterConfig>),
}

impl FilterConfig {
    /// Build the filter spec, compiling scripts on the way.
    pub fn to_spec(&self, scripts: &ScriptEngine) -> Result<FilterSpec> {
        match self {
            FilterConfig::Condition {
                field,
                operator,
                value,
            } => Ok(FilterSpec::new(field.clone(), operator.clone(), value.clone())),
            FilterConfig::Script {
                script,
                name,
                params,
            } => {
                let name = name.as_deref().unwrap_or("script");
                let func = scripts
                    .compile_filter(name, script)
                    .map_err(|e| GridError::Filter(crate::filter::FilterError::Script(e.to_string())))?;
                Ok(FilterSpec::custom(func, params.clone()))
            }
            FilterConfig::Group(items) => Ok(FilterSpec::group(items.iter().filter_map(|item| {
                item.to_spec(scripts)
                    .map_err(|e| tracing::warn!("Skipping filter group member: {}", e))
                    .ok()
            }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_config_untagged_variants() {
        let parsed: Vec<FilterConfig> = serde_json::from_value(json!([
            {"field": "age", "type": ">=", "value": 30},
            {"script": "row.age > params.min", "params": {"min": 3}},
            [{"field": "dept", "type": "=", "value": "eng"}]
        ]))
        .unwrap();

        assert!(matches!(parsed[0], FilterConfig::Condition { ref operator, .. } if operator == ">="));
        assert!(matches!(parsed[1], FilterConfig::Script { .. }));
        assert!(matches!(parsed[2], FilterConfig::Group(ref items) if items.len() == 1));
    }

    #[test]
    fn test_script_filter_to_spec() {
        let scripts = ScriptEngine::new();
        let config = FilterConfig::Script {
            script: "row.age > params.min".to_string(),
            name: Some("older".to_string()),
            params: json!({"min": 3}),
        };
        let spec = config.to_spec(&scripts).unwrap();
        let descriptor = spec.descriptor();
        let condition = descriptor.as_condition().unwrap();
        assert_eq!(condition.field, "older");
        assert!(condition.kind.is_function());
    }

    #[test]
    fn test_bad_script_is_error() {
        let scripts = ScriptEngine::new();
        let config = FilterConfig::Script {
            script: "row.age >".to_string(),
            name: None,
            params: Value::Null,
        };
        assert!(matches!(config.to_spec(&scripts), Err(GridError::Filter(_))));
    }

    #[test]
    fn test_column_config_header_filter() {
        let column = ColumnConfig {
            field: "name".to_string(),
            title: "Name".to_string(),
            header_filter: Some(HeaderFilterConfig {
                editor: EditorKind::Select,
                func: None,
            }),
        }
        .to_column();
        assert_eq!(column.header_filter().map(|h| h.editor), Some(EditorKind::Select));
    }

    #[test]
    fn test_ajax_request_config_merges_headers() {
        let mut settings = AjaxSettings::default();
        settings.method = "POST".to_string();
        settings.headers.insert("X-Api-Key".to_string(), "k".to_string());
        let config = settings.request_config();
        assert_eq!(config.method, "POST");
        assert_eq!(config.headers.len(), 2);
    }
}
