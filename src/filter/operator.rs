//! Operator registry and the loose value semantics the built-in operators use.
//!
//! Operators are binary predicates over `(filter_value, row_value)`. The
//! registry is an immutable value handed to the compiler; extending it is a
//! configuration-time concern done through [`OperatorRegistry::with_operator`].
//!
//! Row data is untyped JSON, so comparisons follow loose, scripting-style
//! coercion rules:
//!
//! - `=` / `!=` use [`loose_eq`] (numeric strings equal numbers, `true == 1`)
//! - ordering compares strings lexicographically and everything else
//!   numerically (`null` → 0, booleans → 0/1); `NaN` never compares
//! - `like` is a case-insensitive substring test on the display form
//!
//! A row may not have the field at all. Operators see that as `None`, which
//! is distinct from a JSON `null`: it never orders, never contains, and is
//! loosely equal only to `null`.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of an operator: `(filter_value, row_value) -> bool`, with
/// `None` for a row that lacks the field.
pub type OperatorFn = dyn Fn(&Value, Option<&Value>) -> bool + Send + Sync;

/// A named operator.
#[derive(Clone)]
pub struct Operator {
    name: Arc<str>,
    func: Arc<OperatorFn>,
}

impl Operator {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the operator against a row value that is present.
    #[inline]
    pub fn apply(&self, filter_value: &Value, row_value: &Value) -> bool {
        self.evaluate(filter_value, Some(row_value))
    }

    /// Evaluate the operator against a field that may be missing.
    #[inline]
    pub fn evaluate(&self, filter_value: &Value, row_value: Option<&Value>) -> bool {
        (self.func)(filter_value, row_value)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operator({})", self.name)
    }
}

/// Immutable lookup table of operators by name.
#[derive(Clone, Debug)]
pub struct OperatorRegistry {
    operators: HashMap<String, Operator>,
}

impl OperatorRegistry {
    /// Registry with no operators at all.
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Registry containing the built-in operator set.
    pub fn builtin() -> Self {
        Self::empty()
            .with_field_operator("=", missing_eq)
            .with_field_operator("!=", |filter, row| !missing_eq(filter, row))
            .with_operator("<", |filter, row| {
                loose_cmp(row, filter) == Some(Ordering::Less)
            })
            .with_operator("<=", |filter, row| {
                matches!(loose_cmp(row, filter), Some(Ordering::Less | Ordering::Equal))
            })
            .with_operator(">", |filter, row| {
                loose_cmp(row, filter) == Some(Ordering::Greater)
            })
            .with_operator(">=", |filter, row| {
                matches!(
                    loose_cmp(row, filter),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            })
            .with_operator("like", like)
            .with_operator("in", in_list)
    }

    /// Add (or replace) an operator. Consumes and returns the registry so
    /// extension only happens while the registry is being built.
    ///
    /// Rows without the field never match.
    pub fn with_operator<F>(self, name: &str, func: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.with_field_operator(name, move |filter, row| {
            row.is_some_and(|row| func(filter, row))
        })
    }

    /// Add (or replace) an operator that decides for itself how a missing
    /// field compares.
    pub fn with_field_operator<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.operators
            .insert(name.to_string(), Operator::new(name, func));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered operator names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ==================== Built-in operators ====================

/// Case-insensitive substring containment.
///
/// A null filter value matches only null row values; a null row value never
/// matches a non-null filter value.
pub fn like(filter_value: &Value, row_value: &Value) -> bool {
    if filter_value.is_null() {
        return row_value.is_null();
    }
    if row_value.is_null() {
        return false;
    }
    js_string(row_value)
        .to_lowercase()
        .contains(&js_string(filter_value).to_lowercase())
}

/// Loose equality where a missing field equals only `null`.
fn missing_eq(filter_value: &Value, row_value: Option<&Value>) -> bool {
    match row_value {
        Some(row_value) => loose_eq(row_value, filter_value),
        None => filter_value.is_null(),
    }
}

/// Membership of the row value in an array filter value.
pub fn in_list(filter_value: &Value, row_value: &Value) -> bool {
    match filter_value {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, row_value)),
        other => {
            tracing::warn!("Filter Error - filter value is not an array: {}", other);
            false
        }
    }
}

// ==================== Loose value semantics ====================

/// Loose equality between two JSON values.
///
/// Arrays and objects compare structurally against each other and by their
/// display form against scalars.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => to_number(a) == to_number(b),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Bool(_), _) => loose_eq(&number_value(to_number(a)), b),
        (_, Value::Bool(_)) => loose_eq(a, &number_value(to_number(b))),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Array(_) | Value::Object(_), _) => loose_eq(&Value::String(js_string(a)), b),
        (_, Value::Array(_) | Value::Object(_)) => loose_eq(a, &Value::String(js_string(b))),
    }
}

/// Ordering between two JSON values: lexicographic when both are strings,
/// numeric otherwise. `None` when either side is not a number after coercion.
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let a = to_primitive(a);
    let b = to_primitive(b);
    match (&a, &b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(&a).partial_cmp(&to_number(&b)),
    }
}

/// Numeric coercion: null → 0, booleans → 0/1, strings parsed (blank → 0),
/// anything unparseable → NaN.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => to_number(&Value::String(js_string(value))),
    }
}

/// Display form of a value as a script runtime would stringify it.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                format_f64(n.as_f64().unwrap_or(f64::NAN))
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Whether a value counts as "empty" for header filter purposes.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(js_string(value)),
        other => other.clone(),
    }
}

fn number_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn format_f64(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let label = if f > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(name: &str) -> Operator {
        OperatorRegistry::builtin().get(name).cloned().unwrap()
    }

    #[test]
    fn test_builtin_names() {
        let registry = OperatorRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["!=", "<", "<=", "=", ">", ">=", "in", "like"]
        );
    }

    #[test]
    fn test_equality_is_loose() {
        let eq = op("=");
        assert!(eq.apply(&json!(5), &json!("5")));
        assert!(eq.apply(&json!("eng"), &json!("eng")));
        assert!(eq.apply(&json!(1), &json!(true)));
        assert!(!eq.apply(&json!(null), &json!(0)));
        assert!(eq.apply(&json!(null), &json!(null)));
        assert!(op("!=").apply(&json!("a"), &json!("b")));
    }

    #[test]
    fn test_ordering_numeric_and_lexicographic() {
        // rowVal >= filterVal
        assert!(op(">=").apply(&json!(30), &json!(31)));
        assert!(op(">=").apply(&json!(30), &json!(30)));
        assert!(!op(">").apply(&json!(30), &json!(30)));
        assert!(op("<").apply(&json!(10), &json!("9")));
        // Both strings: lexicographic, so "9" > "10"
        assert!(op(">").apply(&json!("10"), &json!("9")));
        assert!(op("<=").apply(&json!("b"), &json!("apple")));
    }

    #[test]
    fn test_ordering_with_nan_never_matches() {
        assert!(!op("<").apply(&json!(5), &json!("abc")));
        assert!(!op(">=").apply(&json!(5), &json!("abc")));
    }

    #[test]
    fn test_like() {
        let like = op("like");
        assert!(like.apply(&json!("Al"), &json!("Alice")));
        assert!(like.apply(&json!("ice"), &json!("ALICE")));
        assert!(!like.apply(&json!("bob"), &json!("Alice")));
        assert!(!like.apply(&json!("Al"), &json!(null)));
        assert!(like.apply(&json!(null), &json!(null)));
        assert!(!like.apply(&json!(null), &json!("Alice")));
        assert!(like.apply(&json!(12), &json!(3125)));
    }

    #[test]
    fn test_like_marshall_contains_al() {
        // "MARSHALL" lower-cased is "marshall", which contains "al"
        assert!(op("like").apply(&json!("Al"), &json!("MARSHALL")));
        assert!(!op("like").apply(&json!("Alic"), &json!("MARSHALL")));
    }

    #[test]
    fn test_missing_field() {
        for name in ["<", "<=", ">", ">=", "like", "in"] {
            assert!(!op(name).evaluate(&json!(30), None), "{} matched a missing field", name);
        }
        assert!(!op("like").evaluate(&json!(null), None));
        assert!(!op("=").evaluate(&json!(0), None));
        assert!(op("=").evaluate(&json!(null), None));
        assert!(op("!=").evaluate(&json!(0), None));
        assert!(!op("!=").evaluate(&json!(null), None));
    }

    #[test]
    fn test_custom_operator_skips_missing_field() {
        let registry = OperatorRegistry::empty().with_operator("any", |_, _| true);
        let any = registry.get("any").unwrap();
        assert!(any.apply(&json!(1), &json!(null)));
        assert!(!any.evaluate(&json!(1), None));
    }

    #[test]
    fn test_in() {
        let in_op = op("in");
        assert!(in_op.apply(&json!([1, 2, 3]), &json!(2)));
        assert!(in_op.apply(&json!([1, 2, 3]), &json!("2")));
        assert!(!in_op.apply(&json!([1, 2, 3]), &json!(4)));
        assert!(!in_op.apply(&json!("not array"), &json!("not array")));
    }

    #[test]
    fn test_custom_operator() {
        let registry = OperatorRegistry::builtin()
            .with_operator("starts", |filter, row| {
                js_string(row).starts_with(&js_string(filter))
            });
        assert!(registry.contains("starts"));
        let starts = registry.get("starts").unwrap();
        assert!(starts.apply(&json!("Al"), &json!("Alice")));
        assert!(!starts.apply(&json!("ce"), &json!("Alice")));
    }

    #[test]
    fn test_js_string() {
        assert_eq!(js_string(&json!(2.0)), "2");
        assert_eq!(js_string(&json!(2.5)), "2.5");
        assert_eq!(js_string(&json!([1, null, "a"])), "1,,a");
        assert_eq!(js_string(&json!({"a": 1})), "[object Object]");
        assert_eq!(js_string(&json!(null)), "null");
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!("")));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(false)));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([])));
    }
}
