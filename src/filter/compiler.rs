//! Compiles filter specs and header definitions into row predicates.
//!
//! Compilation resolves everything that does not depend on the row: the
//! operator function, the column accessor, the lowercased needle of a
//! partial header match. Evaluation is then a straight walk over the
//! compiled tree.

use super::condition::{Condition, CustomFilter, FilterKind, FilterSpec};
use super::error::{FilterError, FilterResult};
use super::header::{HeaderFilter, HeaderFilterDefinition, HeaderFilterFunc, HeaderFilterMode};
use super::operator::{js_string, loose_eq, Operator, OperatorRegistry};
use crate::model::{ColumnLookup, FieldAccessor};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// How a predicate reads its field out of a row.
#[derive(Clone)]
pub enum FieldAccess {
    /// Through the column's accessor.
    Column(Arc<dyn FieldAccessor>),
    /// Plain key lookup for fields with no matching column.
    Raw(String),
}

impl FieldAccess {
    /// The field's value, or `None` if the row does not have it.
    pub fn resolve<'a>(&self, row: &'a Value) -> Option<Cow<'a, Value>> {
        match self {
            FieldAccess::Column(accessor) => accessor.find(row).map(Cow::Owned),
            FieldAccess::Raw(field) => row.get(field).map(Cow::Borrowed),
        }
    }
}

#[derive(Clone)]
enum PredicateKind {
    Compare {
        operator: Operator,
        value: Value,
        field: FieldAccess,
    },
    Custom {
        func: CustomFilter,
        params: Value,
    },
    Contains {
        needle: String,
        field: FieldAccess,
    },
    Equals {
        value: Value,
        field: FieldAccess,
    },
}

/// A single compiled condition.
#[derive(Clone)]
pub struct Predicate(PredicateKind);

impl Predicate {
    pub fn matches(&self, row: &Value) -> bool {
        match &self.0 {
            PredicateKind::Compare {
                operator,
                value,
                field,
            } => operator.evaluate(value, field.resolve(row).as_deref()),
            PredicateKind::Custom { func, params } => func.call(row, params),
            PredicateKind::Contains { needle, field } => match field.resolve(row).as_deref() {
                None | Some(Value::Null) => false,
                Some(other) => js_string(other).to_lowercase().contains(needle.as_str()),
            },
            PredicateKind::Equals { value, field } => field
                .resolve(row)
                .is_some_and(|field_value| loose_eq(&field_value, value)),
        }
    }
}

/// A compiled filter list entry.
#[derive(Clone)]
pub enum CompiledEntry {
    Condition(Predicate),
    /// Matches if any child matches. An empty group matches nothing.
    Group(Vec<CompiledEntry>),
}

impl CompiledEntry {
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            CompiledEntry::Condition(predicate) => predicate.matches(row),
            CompiledEntry::Group(children) => children.iter().any(|child| child.matches(row)),
        }
    }
}

/// Turns specs into predicates against a fixed operator registry and
/// column set.
#[derive(Clone)]
pub struct FilterCompiler {
    registry: Arc<OperatorRegistry>,
    columns: Arc<dyn ColumnLookup>,
}

impl FilterCompiler {
    pub fn new(registry: Arc<OperatorRegistry>, columns: Arc<dyn ColumnLookup>) -> Self {
        Self { registry, columns }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn columns(&self) -> &dyn ColumnLookup {
        self.columns.as_ref()
    }

    pub fn field_access(&self, field: &str) -> FieldAccess {
        match self.columns.column(field) {
            Some(column) => FieldAccess::Column(column.accessor()),
            None => FieldAccess::Raw(field.to_string()),
        }
    }

    /// Compile one filter list entry.
    ///
    /// Invalid children of a group are dropped with a warning; the group
    /// itself survives even if nothing in it compiled.
    pub fn compile(&self, spec: &FilterSpec) -> FilterResult<CompiledEntry> {
        match spec {
            FilterSpec::Condition(condition) => {
                self.compile_condition(condition).map(CompiledEntry::Condition)
            }
            FilterSpec::Group(children) => {
                let compiled: Vec<CompiledEntry> = children
                    .iter()
                    .filter_map(|child| match self.compile(child) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!("Filter Error - dropping group member: {}", e);
                            None
                        }
                    })
                    .collect();
                if compiled.is_empty() {
                    tracing::warn!("Filter Error - group has no valid members and will match no rows");
                }
                Ok(CompiledEntry::Group(compiled))
            }
        }
    }

    pub fn compile_condition(&self, condition: &Condition) -> FilterResult<Predicate> {
        match condition {
            Condition::Named {
                field,
                operator,
                value,
            } => {
                let operator = self
                    .registry
                    .get(operator)
                    .cloned()
                    .ok_or_else(|| FilterError::UnknownOperator(operator.clone()))?;
                Ok(Predicate(PredicateKind::Compare {
                    operator,
                    value: value.clone(),
                    field: self.field_access(field),
                }))
            }
            Condition::Custom { func, params } => Ok(Predicate(PredicateKind::Custom {
                func: func.clone(),
                params: params.clone(),
            })),
        }
    }

    /// Compile a header filter for `field` holding `value`.
    pub fn compile_header(
        &self,
        field: &str,
        accessor: Arc<dyn FieldAccessor>,
        definition: &HeaderFilterDefinition,
        value: Value,
    ) -> FilterResult<HeaderFilter> {
        let access = FieldAccess::Column(accessor.clone());
        let (kind, predicate) = match &definition.func {
            Some(HeaderFilterFunc::Custom { func, params }) => {
                let func = func.clone();
                let params = params.clone();
                let header_value = value.clone();
                let custom = CustomFilter::new(format!("header:{}", field), move |row, _| {
                    let field_value = accessor.get(row);
                    let resolved = params.resolve(&header_value, &field_value, row);
                    func(&header_value, &field_value, row, &resolved)
                });
                (
                    FilterKind::Function(custom.clone()),
                    Predicate(PredicateKind::Custom {
                        func: custom,
                        params: Value::Null,
                    }),
                )
            }
            Some(HeaderFilterFunc::Named(name)) => {
                let operator = self
                    .registry
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FilterError::UnknownOperator(name.clone()))?;
                (
                    FilterKind::Named(name.clone()),
                    Predicate(PredicateKind::Compare {
                        operator,
                        value: value.clone(),
                        field: access,
                    }),
                )
            }
            None => {
                let mode = definition.mode();
                let predicate = match mode {
                    HeaderFilterMode::Partial => PredicateKind::Contains {
                        needle: js_string(&value).to_lowercase(),
                        field: access,
                    },
                    HeaderFilterMode::Match => PredicateKind::Equals {
                        value: value.clone(),
                        field: access,
                    },
                };
                (FilterKind::Named(mode.label().to_string()), Predicate(predicate))
            }
        };

        Ok(HeaderFilter {
            value,
            kind,
            predicate,
        })
    }
}
