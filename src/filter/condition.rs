//! Filter conditions, groups and their serializable descriptors.
//!
//! A [`FilterSpec`] is what callers hand to the store: a single [`Condition`]
//! or an OR-group of specs. A [`FilterDescriptor`] is what the store hands
//! back: a snapshot in `{field, type, value}` form that can cross a
//! serialization boundary. Groups serialize as nested arrays.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of a user-supplied row predicate: `(row_data, params) -> bool`.
pub type CustomFilterFn = dyn Fn(&Value, &Value) -> bool + Send + Sync;

/// Type label reported for function conditions when serialized.
pub const FUNCTION_TYPE_LABEL: &str = "function";

/// A user-supplied predicate used directly as a whole condition.
///
/// Two custom filters are equal only if they share the same function
/// allocation, mirroring identity comparison of closures.
#[derive(Clone)]
pub struct CustomFilter {
    name: Arc<str>,
    func: Arc<CustomFilterFn>,
}

impl CustomFilter {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn call(&self, row: &Value, params: &Value) -> bool {
        (self.func)(row, params)
    }
}

impl PartialEq for CustomFilter {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomFilter({})", self.name)
    }
}

/// A single filter rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `operator(value, field_of(row))` using a registered operator.
    Named {
        field: String,
        operator: String,
        value: Value,
    },
    /// `func(row, params)`.
    Custom { func: CustomFilter, params: Value },
}

impl Condition {
    pub fn named(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Condition::Named {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    pub fn custom(func: CustomFilter, params: Value) -> Self {
        Condition::Custom { func, params }
    }

    pub fn descriptor(&self) -> ConditionDescriptor {
        match self {
            Condition::Named {
                field,
                operator,
                value,
            } => ConditionDescriptor {
                field: field.clone(),
                kind: FilterKind::Named(operator.clone()),
                value: value.clone(),
            },
            Condition::Custom { func, params } => ConditionDescriptor {
                field: func.name().to_string(),
                kind: FilterKind::Function(func.clone()),
                value: params.clone(),
            },
        }
    }
}

/// A filter list entry: one condition, or an OR-group.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterSpec {
    Condition(Condition),
    Group(Vec<FilterSpec>),
}

impl FilterSpec {
    /// Shorthand for a named condition.
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        FilterSpec::Condition(Condition::named(field, operator, value))
    }

    /// Shorthand for a custom function condition.
    pub fn custom(func: CustomFilter, params: Value) -> Self {
        FilterSpec::Condition(Condition::custom(func, params))
    }

    /// An OR-group of specs.
    pub fn group(specs: impl IntoIterator<Item = FilterSpec>) -> Self {
        FilterSpec::Group(specs.into_iter().collect())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, FilterSpec::Group(_))
    }

    pub fn descriptor(&self) -> FilterDescriptor {
        match self {
            FilterSpec::Condition(condition) => FilterDescriptor::Condition(condition.descriptor()),
            FilterSpec::Group(specs) => {
                FilterDescriptor::Group(specs.iter().map(FilterSpec::descriptor).collect())
            }
        }
    }
}

impl From<Condition> for FilterSpec {
    fn from(condition: Condition) -> Self {
        FilterSpec::Condition(condition)
    }
}

/// The `type` of a descriptor: an operator name or a function.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterKind {
    Named(String),
    Function(CustomFilter),
}

impl FilterKind {
    /// Label used on the wire. Functions are always reported as `"function"`.
    pub fn label(&self) -> &str {
        match self {
            FilterKind::Named(name) => name,
            FilterKind::Function(_) => FUNCTION_TYPE_LABEL,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, FilterKind::Function(_))
    }
}

impl Serialize for FilterKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for FilterKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FilterKind::Named)
    }
}

/// Snapshot of one condition as `{field, type, value}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionDescriptor {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FilterKind,
    #[serde(default)]
    pub value: Value,
}

impl ConditionDescriptor {
    pub fn new(field: impl Into<String>, kind: FilterKind, value: Value) -> Self {
        Self {
            field: field.into(),
            kind,
            value,
        }
    }
}

/// Snapshot of a filter list entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterDescriptor {
    Condition(ConditionDescriptor),
    Group(Vec<FilterDescriptor>),
}

impl FilterDescriptor {
    /// Replace function types with the literal `"function"` label so the
    /// descriptor no longer holds any closure.
    pub fn into_transport(self) -> Self {
        match self {
            FilterDescriptor::Condition(mut descriptor) => {
                if descriptor.kind.is_function() {
                    descriptor.kind = FilterKind::Named(FUNCTION_TYPE_LABEL.to_string());
                }
                FilterDescriptor::Condition(descriptor)
            }
            FilterDescriptor::Group(items) => FilterDescriptor::Group(
                items
                    .into_iter()
                    .map(FilterDescriptor::into_transport)
                    .collect(),
            ),
        }
    }

    pub fn as_condition(&self) -> Option<&ConditionDescriptor> {
        match self {
            FilterDescriptor::Condition(descriptor) => Some(descriptor),
            FilterDescriptor::Group(_) => None,
        }
    }
}

impl From<FilterDescriptor> for FilterSpec {
    fn from(descriptor: FilterDescriptor) -> Self {
        match descriptor {
            FilterDescriptor::Condition(ConditionDescriptor { field, kind, value }) => match kind {
                FilterKind::Named(operator) => FilterSpec::new(field, operator, value),
                FilterKind::Function(func) => FilterSpec::custom(func, value),
            },
            FilterDescriptor::Group(items) => {
                FilterSpec::Group(items.into_iter().map(FilterSpec::from).collect())
            }
        }
    }
}

/// Handle to an entry in the filter list, returned by `add_filter`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub u64);

impl fmt::Debug for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterId({})", self.0)
    }
}

/// What to remove from the filter list.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterTarget {
    /// The exact entry returned from `add_filter`.
    Id(FilterId),
    /// The first entry whose spec equals this one.
    Spec(FilterSpec),
}

impl From<FilterId> for FilterTarget {
    fn from(id: FilterId) -> Self {
        FilterTarget::Id(id)
    }
}

impl From<FilterSpec> for FilterTarget {
    fn from(spec: FilterSpec) -> Self {
        FilterTarget::Spec(spec)
    }
}
