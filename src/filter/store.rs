//! The filter list and header filter map.
//!
//! [`FilterStore`] owns every active filter. Entries are compiled on the
//! way in, so the store only ever holds predicates that can run. Every
//! mutation raises the changed flag, which the owning table consumes with
//! [`FilterStore::has_changed`] to decide whether a re-filter is due.

use super::compiler::{CompiledEntry, FilterCompiler};
use super::condition::{FilterDescriptor, FilterId, FilterSpec, FilterTarget};
use super::error::{FilterError, FilterResult};
use super::header::{HeaderFilter, HeaderFilterDefinition};
use super::hooks::{FilterHooks, PersistKind, PersistenceHook};
use super::operator::is_falsy;
use crate::model::{ColumnDefinition, FieldAccessor, RefreshTrigger};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub(super) struct StoredFilter {
    pub(super) id: FilterId,
    pub(super) spec: FilterSpec,
    pub(super) compiled: CompiledEntry,
}

struct HeaderColumn {
    accessor: Arc<dyn FieldAccessor>,
    definition: HeaderFilterDefinition,
    value: Value,
}

/// Owner of the main filter list and the header filter map.
pub struct FilterStore {
    compiler: FilterCompiler,
    pub(super) entries: Vec<StoredFilter>,
    pub(super) header_filters: BTreeMap<String, HeaderFilter>,
    header_columns: HashMap<String, HeaderColumn>,
    changed: bool,
    next_id: u64,
    pub(super) hooks: Option<Arc<dyn FilterHooks>>,
    persistence: Option<Arc<dyn PersistenceHook>>,
    refresh: Option<Arc<dyn RefreshTrigger>>,
    pub(super) remote_filtering: bool,
}

impl FilterStore {
    pub fn new(compiler: FilterCompiler) -> Self {
        Self {
            compiler,
            entries: Vec::new(),
            header_filters: BTreeMap::new(),
            header_columns: HashMap::new(),
            changed: false,
            next_id: 0,
            hooks: None,
            persistence: None,
            refresh: None,
            remote_filtering: false,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn FilterHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceHook>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_refresh(mut self, refresh: Arc<dyn RefreshTrigger>) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// When set, filtering is left to the server and [`FilterStore::filter`]
    /// passes every row through.
    pub fn with_remote_filtering(mut self, remote: bool) -> Self {
        self.remote_filtering = remote;
        self
    }

    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    pub fn remote_filtering(&self) -> bool {
        self.remote_filtering
    }

    // ==================== Main filter list ====================

    /// Replace the whole filter list.
    pub fn set_filter(&mut self, specs: impl IntoIterator<Item = FilterSpec>) -> Vec<FilterId> {
        self.entries.clear();
        self.changed = true;
        self.add_filter(specs)
    }

    /// Compile and append filters. Specs that fail to compile are logged
    /// and skipped; the returned ids cover only the accepted ones.
    pub fn add_filter(&mut self, specs: impl IntoIterator<Item = FilterSpec>) -> Vec<FilterId> {
        let mut added = Vec::new();
        for spec in specs {
            match self.compiler.compile(&spec) {
                Ok(compiled) => {
                    let id = FilterId(self.next_id);
                    self.next_id += 1;
                    tracing::debug!(?id, ?spec, "Filter added");
                    self.entries.push(StoredFilter { id, spec, compiled });
                    self.changed = true;
                    added.push(id);
                }
                Err(e) => tracing::warn!("Filter Error - {}", e),
            }
        }
        self.persist();
        added
    }

    /// Remove filters by id or by exact spec. Targets with no match are
    /// logged and leave the changed flag alone.
    pub fn remove_filter<T>(&mut self, targets: impl IntoIterator<Item = T>) -> usize
    where
        T: Into<FilterTarget>,
    {
        let mut removed = 0;
        for target in targets {
            let target = target.into();
            let position = match &target {
                FilterTarget::Id(id) => self.entries.iter().position(|e| e.id == *id),
                FilterTarget::Spec(spec) => self.entries.iter().position(|e| e.spec == *spec),
            };
            match position {
                Some(index) => {
                    self.entries.remove(index);
                    self.changed = true;
                    removed += 1;
                }
                None => {
                    let err = FilterError::NotFound(format!("{:?}", target));
                    tracing::warn!("Filter Error - {}", err);
                }
            }
        }
        self.persist();
        removed
    }

    /// Empty the filter list, and the header filters too if asked.
    pub fn clear_filter(&mut self, include_header: bool) {
        self.entries.clear();
        if include_header {
            self.clear_header_filter();
        }
        self.changed = true;
        self.persist();
    }

    /// Read and reset the changed flag.
    pub fn has_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn is_active(&self) -> bool {
        !self.entries.is_empty() || !self.header_filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of active filters, header filters first.
    pub fn get_filters(&self, include_header: bool, for_transport: bool) -> Vec<FilterDescriptor> {
        let mut output = if include_header {
            self.get_header_filters()
        } else {
            Vec::new()
        };
        output.extend(self.entries.iter().map(|entry| entry.spec.descriptor()));
        if for_transport {
            output = output
                .into_iter()
                .map(FilterDescriptor::into_transport)
                .collect();
        }
        output
    }

    fn persist(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save(PersistKind::Filter, &self.get_filters(false, true));
        }
    }

    // ==================== Header filters ====================

    /// Register a column's header filter definition. Returns whether the
    /// column now takes header values.
    pub fn initialize_column(&mut self, column: &ColumnDefinition) -> bool {
        let Some(definition) = column.header_filter() else {
            return false;
        };
        if column.field().is_empty() {
            let err = FilterError::MissingField(column.title().to_string());
            tracing::warn!("Column Filter Error - Cannot add header filter: {}", err);
            return false;
        }
        self.header_columns.insert(
            column.field().to_string(),
            HeaderColumn {
                accessor: column.accessor(),
                definition: definition.clone(),
                value: Value::String(String::new()),
            },
        );
        true
    }

    pub fn initialize_columns<'a>(
        &mut self,
        columns: impl IntoIterator<Item = &'a ColumnDefinition>,
    ) -> usize {
        columns
            .into_iter()
            .filter(|column| self.initialize_column(column))
            .count()
    }

    /// Install, replace or remove the header filter for `field`.
    ///
    /// Falsy values (empty string, null, false, 0) remove the filter. The
    /// changed flag is raised and a refresh requested in every case where
    /// the column takes header values.
    pub fn set_header_filter_value(&mut self, field: &str, value: Value) -> FilterResult<()> {
        let Some(column) = self.header_columns.get_mut(field) else {
            let err = FilterError::NoHeaderFilter(field.to_string());
            tracing::warn!("Column Filter Error - {}", err);
            return Err(err);
        };
        column.value = value.clone();
        let accessor = column.accessor.clone();
        let definition = column.definition.clone();

        let result = if is_falsy(&value) {
            self.header_filters.remove(field);
            Ok(())
        } else {
            match self
                .compiler
                .compile_header(field, accessor, &definition, value)
            {
                Ok(header) => {
                    self.header_filters.insert(field.to_string(), header);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!("Filter Error - No matching filter type found: {}", e);
                    self.header_filters.remove(field);
                    Err(e)
                }
            }
        };

        self.changed = true;
        if let Some(refresh) = &self.refresh {
            refresh.filter_refresh();
        }
        result
    }

    /// The value currently bound to a column's header control.
    pub fn header_filter_value(&self, field: &str) -> Option<&Value> {
        match self.header_columns.get(field) {
            Some(column) => Some(&column.value),
            None => {
                tracing::warn!("Column Filter Error - No header filter set on column: {}", field);
                None
            }
        }
    }

    /// Drop every header filter and reset the bound values.
    pub fn clear_header_filter(&mut self) {
        self.header_filters.clear();
        for column in self.header_columns.values_mut() {
            column.value = Value::String(String::new());
        }
        self.changed = true;
    }

    pub fn get_header_filters(&self) -> Vec<FilterDescriptor> {
        self.header_filters
            .iter()
            .map(|(field, header)| {
                FilterDescriptor::Condition(super::condition::ConditionDescriptor::new(
                    field.clone(),
                    header.kind().clone(),
                    header.value().clone(),
                ))
            })
            .collect()
    }
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStore")
            .field("filters", &self.entries.iter().map(|e| &e.spec).collect::<Vec<_>>())
            .field("header_filters", &self.header_filters)
            .field("changed", &self.changed)
            .field("remote_filtering", &self.remote_filtering)
            .finish_non_exhaustive()
    }
}
