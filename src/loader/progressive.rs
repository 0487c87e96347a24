//! Progressive loading: fetch data page by page instead of in one request.
//!
//! The loader does not page by itself. It resets the table and hands
//! control to a [`Paginator`], which issues one request per page and asks
//! for the next page either straight away (`Load`) or when the viewport
//! nears the bottom (`Scroll`).

use crate::model::RowSink;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressiveMode {
    /// Every page is requested as soon as the previous one arrives.
    Load,
    /// The next page is requested when the user scrolls close to the end.
    Scroll,
}

/// Page navigation collaborator.
#[cfg_attr(test, mockall::automock)]
pub trait Paginator: Send + Sync {
    fn set_page(&self, page: u32);
    fn next_page(&self);
}

pub struct ProgressiveLoader {
    mode: ProgressiveMode,
    scroll_margin: Option<f64>,
    paginator: Arc<dyn Paginator>,
}

impl ProgressiveLoader {
    pub fn new(mode: ProgressiveMode, paginator: Arc<dyn Paginator>) -> Self {
        Self {
            mode,
            scroll_margin: None,
            paginator,
        }
    }

    /// Distance from the bottom, in pixels, that triggers the next page.
    /// Defaults to twice the viewport height.
    pub fn with_scroll_margin(mut self, margin: Option<f64>) -> Self {
        self.scroll_margin = margin;
        self
    }

    pub fn mode(&self) -> ProgressiveMode {
        self.mode
    }

    /// Progressive loading and pagination are mutually exclusive. Returns
    /// the mode to use, or `None` with an error logged on conflict.
    pub fn validate(mode: Option<ProgressiveMode>, pagination: bool) -> Option<ProgressiveMode> {
        match mode {
            Some(_) if pagination => {
                tracing::error!(
                    "Progressive Load Error - Pagination and progressive load cannot be used at the same time"
                );
                None
            }
            other => other,
        }
    }

    /// Clear local rows and restart paging from page 1.
    pub fn start(&self, sink: &dyn RowSink) {
        tracing::debug!(mode = ?self.mode, "Starting progressive load");
        sink.set_data(Value::Array(Vec::new()), None);
        self.paginator.set_page(1);
    }

    /// Scroll signal. `diff` is the remaining distance to the bottom.
    /// Ignored while a request is in flight.
    pub fn next_page(&self, loading: bool, diff: f64, viewport_height: f64) -> bool {
        if loading || self.mode != ProgressiveMode::Scroll {
            return false;
        }
        let margin = self.scroll_margin.unwrap_or(viewport_height * 2.0);
        if diff < margin {
            self.paginator.next_page();
            true
        } else {
            false
        }
    }

    /// Called after a page has been applied. In `Load` mode this chains
    /// straight into the next page until the last one.
    pub fn page_loaded(&self, page: u32, last_page: u32) -> bool {
        if self.mode == ProgressiveMode::Load && page < last_page {
            self.paginator.next_page();
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for ProgressiveLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveLoader")
            .field("mode", &self.mode)
            .field("scroll_margin", &self.scroll_margin)
            .finish_non_exhaustive()
    }
}
