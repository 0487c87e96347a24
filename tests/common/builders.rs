//! Test data builders for creating test objects

use datagrid_rs::filter::{FilterCompiler, FilterStore, HeaderFilterDefinition, OperatorRegistry};
use datagrid_rs::model::{ColumnDefinition, ColumnSet, TableModel};
use serde_json::{json, Value};
use std::sync::Arc;

/// The people table used across the filter tests
pub fn people() -> Value {
    json!([
        {"name": "Alice", "age": 34, "dept": "eng"},
        {"name": "Bob", "age": 19, "dept": "ops"},
        {"name": "Carol", "age": 41, "dept": "eng"},
        {"name": "Dave", "age": 27, "dept": "sales"},
        {"name": "Eve", "age": null, "dept": "eng"}
    ])
}

pub fn people_table() -> TableModel {
    TableModel::with_rows(people())
}

/// Builder for creating test filter stores
pub struct StoreBuilder {
    registry: OperatorRegistry,
    columns: Vec<ColumnDefinition>,
    remote: bool,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            registry: OperatorRegistry::builtin(),
            columns: Vec::new(),
            remote: false,
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Column with a header filter using the given definition
    pub fn header(self, field: &str, definition: HeaderFilterDefinition) -> Self {
        self.column(ColumnDefinition::new(field, field).with_header_filter(definition))
    }

    pub fn registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn build(self) -> FilterStore {
        let columns = Arc::new(ColumnSet::new(self.columns));
        let compiler = FilterCompiler::new(Arc::new(self.registry), columns.clone());
        let mut store = FilterStore::new(compiler).with_remote_filtering(self.remote);
        store.initialize_columns(columns.iter().map(|c| c.as_ref()));
        store
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_rs::filter::EditorKind;

    #[test]
    fn test_store_builder() {
        let store = StoreBuilder::new()
            .header("name", HeaderFilterDefinition::new(EditorKind::Input))
            .build();

        assert!(store.is_empty());
        assert!(!store.is_active());
        assert_eq!(store.header_filter_value("name"), Some(&json!("")));
    }
}
