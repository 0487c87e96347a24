//! Core data types shared by the filter and loader subsystems
//!
//! Rows are plain JSON records (`serde_json::Value`) wrapped with a stable
//! identifier. The table hands rows around as [`RowHandle`]s so that filtering
//! produces a new list of handles without copying row data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Stable identifier assigned to a row when it enters the model.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    data: Value,
}

impl Row {
    pub fn new(id: RowId, data: Value) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// The plain record backing this row.
    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Shared handle to a row. Cloning a handle never clones row data.
pub type RowHandle = Arc<Row>;

/// Where freshly loaded rows are placed relative to existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Top,
    Bottom,
}

/// Indicator state emitted by the load pipeline for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderIndicator {
    /// Nothing shown
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The last request failed; cleared automatically after a delay
    Error,
}

impl LoaderIndicator {
    pub fn is_visible(self) -> bool {
        !matches!(self, LoaderIndicator::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_accessors() {
        let row = Row::new(RowId(7), json!({"name": "Alice"}));
        assert_eq!(row.id(), RowId(7));
        assert_eq!(row.data()["name"], "Alice");
    }

    #[test]
    fn test_row_id_debug() {
        assert_eq!(format!("{:?}", RowId(3)), "RowId(3)");
    }

    #[test]
    fn test_indicator_visibility() {
        assert!(!LoaderIndicator::Idle.is_visible());
        assert!(LoaderIndicator::Loading.is_visible());
        assert!(LoaderIndicator::Error.is_visible());
    }

    #[test]
    fn test_insert_position_serde() {
        let pos: InsertPosition = serde_json::from_str("\"top\"").unwrap();
        assert_eq!(pos, InsertPosition::Top);
    }
}
