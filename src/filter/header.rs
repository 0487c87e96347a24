//! Per-column header filter definitions.
//!
//! A column opts into header filtering by carrying a
//! [`HeaderFilterDefinition`]. Whenever the header value changes, the store
//! compiles the definition plus the new value into a [`HeaderFilter`] which
//! is ANDed with the main filter list.

use super::compiler::Predicate;
use super::condition::FilterKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The kind of editor that produces header values.
///
/// Free-text editors filter by case-insensitive substring, every other
/// editor filters by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    #[default]
    Input,
    Textarea,
    Number,
    Select,
    Tick,
}

/// Default matching behaviour when no function is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFilterMode {
    /// `lowercase(field) contains lowercase(value)`, reported as `"like"`
    Partial,
    /// Loose equality, reported as `"="`
    Match,
}

impl From<EditorKind> for HeaderFilterMode {
    fn from(editor: EditorKind) -> Self {
        match editor {
            EditorKind::Input | EditorKind::Textarea => HeaderFilterMode::Partial,
            EditorKind::Number | EditorKind::Select | EditorKind::Tick => HeaderFilterMode::Match,
        }
    }
}

impl HeaderFilterMode {
    pub fn label(self) -> &'static str {
        match self {
            HeaderFilterMode::Partial => "like",
            HeaderFilterMode::Match => "=",
        }
    }
}

/// `(header_value, field_value, row_data, params) -> bool`
pub type HeaderFilterFn = dyn Fn(&Value, &Value, &Value, &Value) -> bool + Send + Sync;

/// `(header_value, field_value, row_data) -> params`
pub type HeaderParamsFn = dyn Fn(&Value, &Value, &Value) -> Value + Send + Sync;

/// Parameters passed to a custom header function.
#[derive(Clone)]
pub enum HeaderFilterParams {
    Static(Value),
    /// Recomputed for every row.
    Dynamic(Arc<HeaderParamsFn>),
}

impl HeaderFilterParams {
    pub fn dynamic<F>(func: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> Value + Send + Sync + 'static,
    {
        HeaderFilterParams::Dynamic(Arc::new(func))
    }

    pub fn resolve(&self, value: &Value, field_value: &Value, row: &Value) -> Value {
        match self {
            HeaderFilterParams::Static(params) => params.clone(),
            HeaderFilterParams::Dynamic(func) => func(value, field_value, row),
        }
    }
}

impl Default for HeaderFilterParams {
    fn default() -> Self {
        HeaderFilterParams::Static(Value::Object(Default::default()))
    }
}

impl fmt::Debug for HeaderFilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderFilterParams::Static(value) => f.debug_tuple("Static").field(value).finish(),
            HeaderFilterParams::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Explicit header filter behaviour overriding the editor default.
#[derive(Clone)]
pub enum HeaderFilterFunc {
    /// A registered operator applied as `op(header_value, field_value)`.
    Named(String),
    Custom {
        func: Arc<HeaderFilterFn>,
        params: HeaderFilterParams,
    },
}

impl HeaderFilterFunc {
    pub fn custom<F>(func: F, params: HeaderFilterParams) -> Self
    where
        F: Fn(&Value, &Value, &Value, &Value) -> bool + Send + Sync + 'static,
    {
        HeaderFilterFunc::Custom {
            func: Arc::new(func),
            params,
        }
    }
}

impl fmt::Debug for HeaderFilterFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderFilterFunc::Named(name) => f.debug_tuple("Named").field(name).finish(),
            HeaderFilterFunc::Custom { params, .. } => f
                .debug_struct("Custom")
                .field("params", params)
                .finish_non_exhaustive(),
        }
    }
}

/// Header filter configuration attached to a column.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilterDefinition {
    pub editor: EditorKind,
    pub func: Option<HeaderFilterFunc>,
}

impl HeaderFilterDefinition {
    pub fn new(editor: EditorKind) -> Self {
        Self { editor, func: None }
    }

    pub fn with_operator(mut self, name: impl Into<String>) -> Self {
        self.func = Some(HeaderFilterFunc::Named(name.into()));
        self
    }

    pub fn with_custom<F>(mut self, func: F, params: HeaderFilterParams) -> Self
    where
        F: Fn(&Value, &Value, &Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.func = Some(HeaderFilterFunc::custom(func, params));
        self
    }

    pub fn mode(&self) -> HeaderFilterMode {
        HeaderFilterMode::from(self.editor)
    }
}

/// A compiled, active header filter.
#[derive(Clone)]
pub struct HeaderFilter {
    pub(crate) value: Value,
    pub(crate) kind: FilterKind,
    pub(crate) predicate: Predicate,
}

impl HeaderFilter {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    #[inline]
    pub fn matches(&self, row: &Value) -> bool {
        self.predicate.matches(row)
    }
}

impl fmt::Debug for HeaderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderFilter")
            .field("value", &self.value)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_from_editor() {
        assert_eq!(HeaderFilterMode::from(EditorKind::Input), HeaderFilterMode::Partial);
        assert_eq!(HeaderFilterMode::from(EditorKind::Textarea), HeaderFilterMode::Partial);
        assert_eq!(HeaderFilterMode::from(EditorKind::Select), HeaderFilterMode::Match);
        assert_eq!(HeaderFilterMode::from(EditorKind::Number).label(), "=");
    }

    #[test]
    fn test_dynamic_params_resolve_per_row() {
        let params = HeaderFilterParams::dynamic(|value, field, _row| json!([value, field]));
        assert_eq!(params.resolve(&json!("a"), &json!(1), &json!({})), json!(["a", 1]));
    }

    #[test]
    fn test_editor_kind_deserializes() {
        let kind: EditorKind = serde_json::from_str("\"select\"").unwrap();
        assert_eq!(kind, EditorKind::Select);
    }
}
