//! Callbacks fired by the filter store.

use super::condition::FilterDescriptor;
use crate::types::RowHandle;
use serde::{Deserialize, Serialize};

/// Observers of a filter pass. Both methods default to no-ops.
#[cfg_attr(test, mockall::automock)]
pub trait FilterHooks: Send + Sync {
    /// Called with the main filter list before any row is scanned.
    fn before_filter(&self, _filters: &[FilterDescriptor]) {}

    /// Called with the main filter list and the matched rows.
    fn after_filter(&self, _filters: &[FilterDescriptor], _rows: &[RowHandle]) {}
}

/// What kind of state is being persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistKind {
    Filter,
}

impl PersistKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PersistKind::Filter => "filter",
        }
    }
}

/// Receives a transport-form snapshot of the main filter list after each
/// mutation.
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceHook: Send + Sync {
    fn save(&self, kind: PersistKind, filters: &[FilterDescriptor]);
}
