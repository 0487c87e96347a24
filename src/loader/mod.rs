//! Remote data loading
//!
//! The loader fetches table data from a url through an injected
//! [`Transport`] and guarantees that only the most recently issued request
//! can change table state. See [`LoadPipeline`] for the dispatch rules and
//! [`ProgressiveLoader`] for page-by-page loading.

pub mod params;
mod pipeline;
mod progressive;
mod sequencer;
mod transport;

pub use pipeline::{
    ConfigUpdate, DefaultLoadHooks, LoadFailure, LoadHooks, LoadPipeline, RequestOutcome,
    DEFAULT_ERROR_DISPLAY,
};
pub use progressive::{Paginator, ProgressiveLoader, ProgressiveMode};
pub use sequencer::{RequestSequencer, Ticket};
pub use transport::{
    RequestConfig, Transport, TransportError, TransportResponse, DEFAULT_CONTENT_TYPE,
    DEFAULT_METHOD,
};

#[cfg(test)]
pub(crate) use progressive::MockPaginator;
#[cfg(test)]
pub(crate) use transport::MockTransport;
