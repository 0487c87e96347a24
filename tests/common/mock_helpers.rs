//! Mock construction helpers
//!
//! Hand-written fakes for the loader seams. Unlike the mockall mocks inside
//! the crate, these keep state across awaits so tests can overlap requests.

use async_trait::async_trait;
use datagrid_rs::loader::{
    LoadFailure, LoadHooks, Paginator, RequestConfig, Transport, TransportError,
    TransportResponse,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply: how long to wait and what to return
pub struct Reply {
    pub delay: Duration,
    pub result: Result<TransportResponse, TransportError>,
}

impl Reply {
    pub fn ok(delay_ms: u64, body: &str) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(TransportResponse::ok(body)),
        }
    }

    pub fn status(delay_ms: u64, status: u16, status_text: &str) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(TransportResponse::new(status, status_text, "")),
        }
    }

    pub fn connection_error(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Err(TransportError::Connection("connection refused".to_string())),
        }
    }
}

/// Transport that answers requests from a queue, in dispatch order
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(String, RequestConfig)>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Urls and configs seen so far
    pub fn requests(&self) -> Vec<(String, RequestConfig)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), config.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request");
        tokio::time::sleep(reply.delay).await;
        reply.result
    }
}

/// Hooks that record what they saw and optionally veto requests
#[derive(Default)]
pub struct RecordingHooks {
    pub veto: bool,
    pub failures: Mutex<Vec<(u64, bool, String)>>,
    pub responses: Mutex<Vec<Value>>,
}

impl RecordingHooks {
    pub fn vetoing() -> Self {
        Self {
            veto: true,
            ..Self::default()
        }
    }
}

impl LoadHooks for RecordingHooks {
    fn before_request(&self, _url: &str, _params: &Value) -> bool {
        !self.veto
    }

    fn after_response(&self, _url: &str, _params: &Value, response: Value) -> Value {
        self.responses.lock().unwrap().push(response.clone());
        response
    }

    fn on_error(&self, failure: &LoadFailure) {
        self.failures.lock().unwrap().push((
            failure.ticket.number(),
            failure.stale,
            failure.error.to_string(),
        ));
    }
}

/// Paginator that records the calls it receives
#[derive(Default)]
pub struct RecordingPaginator {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingPaginator {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Paginator for RecordingPaginator {
    fn set_page(&self, page: u32) {
        self.calls.lock().unwrap().push(format!("set_page({})", page));
    }

    fn next_page(&self) {
        self.calls.lock().unwrap().push("next_page".to_string());
    }
}
