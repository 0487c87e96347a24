//! Table-side collaborators of the filter and loader subsystems.
//!
//! The filter engine never reaches into a concrete table. It asks a
//! [`ColumnLookup`] for column definitions, reads values through
//! [`FieldAccessor`]s, and notifies a [`RefreshTrigger`] when header values
//! change. The loader hands decoded payloads to a [`RowSink`].
//! [`TableModel`] is an in-memory implementation of the sinks, used by the
//! CLI and the tests.

use crate::filter::HeaderFilterDefinition;
use crate::types::{InsertPosition, Row, RowHandle, RowId};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Reads a column's value out of a row record.
pub trait FieldAccessor: Send + Sync {
    fn get(&self, row: &Value) -> Value;

    /// Like [`get`](Self::get), but `None` when the row has no such field.
    fn find(&self, row: &Value) -> Option<Value> {
        Some(self.get(row))
    }
}

impl<F> FieldAccessor for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn get(&self, row: &Value) -> Value {
        self(row)
    }
}

/// Dotted-path lookup, `"address.city"` reads `row["address"]["city"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAccessor {
    segments: Vec<String>,
}

impl PathAccessor {
    pub fn new(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn lookup<'a>(&self, row: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(row, |value, segment| match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl FieldAccessor for PathAccessor {
    fn get(&self, row: &Value) -> Value {
        self.lookup(row).cloned().unwrap_or(Value::Null)
    }

    fn find(&self, row: &Value) -> Option<Value> {
        self.lookup(row).cloned()
    }
}

/// A table column as seen by the filter engine.
pub struct ColumnDefinition {
    field: String,
    title: String,
    accessor: Arc<dyn FieldAccessor>,
    header_filter: Option<HeaderFilterDefinition>,
}

impl ColumnDefinition {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            accessor: Arc::new(PathAccessor::new(&field)),
            field,
            title: title.into(),
            header_filter: None,
        }
    }

    /// Replace the default path lookup with a custom accessor.
    pub fn with_accessor<A: FieldAccessor + 'static>(mut self, accessor: A) -> Self {
        self.accessor = Arc::new(accessor);
        self
    }

    pub fn with_header_filter(mut self, definition: HeaderFilterDefinition) -> Self {
        self.header_filter = Some(definition);
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn accessor(&self) -> Arc<dyn FieldAccessor> {
        self.accessor.clone()
    }

    pub fn header_filter(&self) -> Option<&HeaderFilterDefinition> {
        self.header_filter.as_ref()
    }

    pub fn value(&self, row: &Value) -> Value {
        self.accessor.get(row)
    }
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("field", &self.field)
            .field("title", &self.title)
            .field("header_filter", &self.header_filter)
            .finish_non_exhaustive()
    }
}

/// Resolves a field name to its column definition.
pub trait ColumnLookup: Send + Sync {
    fn column(&self, field: &str) -> Option<Arc<ColumnDefinition>>;
}

/// A fixed set of columns keyed by field.
#[derive(Debug, Default)]
pub struct ColumnSet {
    columns: Vec<Arc<ColumnDefinition>>,
    by_field: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(columns: impl IntoIterator<Item = ColumnDefinition>) -> Self {
        let mut set = Self::default();
        for column in columns {
            set.push(column);
        }
        set
    }

    pub fn push(&mut self, column: ColumnDefinition) -> Arc<ColumnDefinition> {
        let column = Arc::new(column);
        if !column.field().is_empty() {
            self.by_field
                .insert(column.field().to_string(), self.columns.len());
        }
        self.columns.push(column.clone());
        column
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ColumnDefinition>> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl ColumnLookup for ColumnSet {
    fn column(&self, field: &str) -> Option<Arc<ColumnDefinition>> {
        self.by_field.get(field).map(|&i| self.columns[i].clone())
    }
}

/// Receives decoded payloads from the loader.
#[cfg_attr(test, mockall::automock)]
pub trait RowSink: Send + Sync {
    /// `None` replaces all rows, a position inserts at that end.
    fn set_data(&self, data: Value, position: Option<InsertPosition>);
}

/// Asks the owning table to re-run filtering and redraw.
#[cfg_attr(test, mockall::automock)]
pub trait RefreshTrigger: Send + Sync {
    fn filter_refresh(&self);
}

/// In-memory row storage.
#[derive(Debug, Default)]
pub struct TableModel {
    rows: RwLock<Vec<RowHandle>>,
    next_id: AtomicU64,
    refreshes: AtomicU64,
}

impl TableModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(data: Value) -> Self {
        let model = Self::new();
        model.set_data(data, None);
        model
    }

    /// Snapshot of the current rows in display order.
    pub fn rows(&self) -> Vec<RowHandle> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of refresh requests received so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn build_rows(&self, data: Value) -> Vec<RowHandle> {
        let records = match data {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            other => {
                tracing::warn!("Data Loading Error - expected an array of rows, got {}", other);
                Vec::new()
            }
        };
        records
            .into_iter()
            .map(|record| {
                let id = RowId(self.next_id.fetch_add(1, Ordering::Relaxed));
                Arc::new(Row::new(id, record))
            })
            .collect()
    }
}

impl RowSink for TableModel {
    fn set_data(&self, data: Value, position: Option<InsertPosition>) {
        let incoming = self.build_rows(data);
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(count = incoming.len(), ?position, "Applying row data");
        match position {
            None => *rows = incoming,
            Some(InsertPosition::Bottom) => rows.extend(incoming),
            Some(InsertPosition::Top) => {
                rows.splice(0..0, incoming);
            }
        }
    }
}

impl RefreshTrigger for TableModel {
    fn filter_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }
}
