//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use datagrid_rs::RowHandle;
use serde_json::Value;

/// Pull one string field out of every row, in order
pub fn field_values<'a>(rows: &'a [RowHandle], field: &str) -> Vec<&'a str> {
    rows.iter()
        .map(|row| row.data().get(field).and_then(Value::as_str).unwrap_or_default())
        .collect()
}
