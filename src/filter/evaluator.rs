//! Row filtering against the active filter set.

use super::store::FilterStore;
use crate::types::{Row, RowHandle};

impl FilterStore {
    /// Return the rows that pass every filter, in input order.
    ///
    /// Main list entries and header filters are ANDed together. With
    /// nothing active, or with remote filtering enabled, every row passes.
    /// The result is always a fresh list.
    pub fn filter(&self, rows: &[RowHandle]) -> Vec<RowHandle> {
        let descriptors = self
            .hooks
            .as_ref()
            .map(|_| self.get_filters(false, false))
            .unwrap_or_default();

        if let Some(hooks) = &self.hooks {
            hooks.before_filter(&descriptors);
        }

        let output: Vec<RowHandle> = if self.is_active() && !self.remote_filtering {
            rows.iter()
                .filter(|row| self.filter_row(row))
                .cloned()
                .collect()
        } else {
            rows.to_vec()
        };

        tracing::trace!(input = rows.len(), output = output.len(), "Filter pass");

        if let Some(hooks) = &self.hooks {
            hooks.after_filter(&descriptors, &output);
        }
        output
    }

    /// Whether a single row passes the active filters.
    pub fn filter_row(&self, row: &Row) -> bool {
        let data = row.data();
        self.entries.iter().all(|entry| entry.compiled.matches(data))
            && self.header_filters.values().all(|header| header.matches(data))
    }
}
