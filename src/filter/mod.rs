//! Row filtering
//!
//! Filters come in two layers that are always ANDed together:
//!
//! - the **filter list**, an ordered list of conditions and OR-groups managed
//!   through [`FilterStore::set_filter`], [`FilterStore::add_filter`] and
//!   friends;
//! - **header filters**, at most one per column, driven by the value typed
//!   into the column header.
//!
//! Conditions name an operator from an [`OperatorRegistry`] or supply a
//! function directly. Everything is compiled to a predicate on insertion.
//!
//! ```ignore
//! let compiler = FilterCompiler::new(Arc::new(OperatorRegistry::builtin()), columns);
//! let mut store = FilterStore::new(compiler);
//! store.add_filter([
//!     FilterSpec::new("age", ">=", json!(30)),
//!     FilterSpec::group([
//!         FilterSpec::new("dept", "=", json!("eng")),
//!         FilterSpec::new("dept", "=", json!("sales")),
//!     ]),
//! ]);
//! let visible = store.filter(&rows);
//! ```

mod compiler;
mod condition;
mod error;
mod evaluator;
mod header;
mod hooks;
pub mod operator;
mod store;

pub use compiler::{CompiledEntry, FieldAccess, FilterCompiler, Predicate};
pub use condition::{
    Condition, ConditionDescriptor, CustomFilter, CustomFilterFn, FilterDescriptor, FilterId,
    FilterKind, FilterSpec, FilterTarget, FUNCTION_TYPE_LABEL,
};
pub use error::{FilterError, FilterResult};
pub use header::{
    EditorKind, HeaderFilter, HeaderFilterDefinition, HeaderFilterFn, HeaderFilterFunc,
    HeaderFilterMode, HeaderFilterParams, HeaderParamsFn,
};
pub use hooks::{FilterHooks, PersistKind, PersistenceHook};
pub use operator::{Operator, OperatorFn, OperatorRegistry};
pub use store::FilterStore;
