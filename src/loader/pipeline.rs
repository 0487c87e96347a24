//! Sequenced remote loading.
//!
//! [`LoadPipeline`] owns the request state (url, params, request config)
//! and dispatches requests through an injected [`Transport`]. Each dispatch
//! captures a [`Ticket`]; a successful response is applied only if its
//! ticket is still current when it resolves, so a slow response can never
//! overwrite data from a newer request.

use super::params::{append_query, encode_query, is_empty};
use super::progressive::{Paginator, ProgressiveLoader, ProgressiveMode};
use super::sequencer::{RequestSequencer, Ticket};
use super::transport::{RequestConfig, Transport, TransportError};
use crate::model::RowSink;
use crate::types::{InsertPosition, LoaderIndicator};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long the error indicator stays up after a failed request.
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_millis(3000);

/// Callbacks around each request. All default to pass-through.
#[cfg_attr(test, mockall::automock)]
pub trait LoadHooks: Send + Sync {
    /// Return `false` to cancel the request before it is sent.
    fn before_request(&self, _url: &str, _params: &Value) -> bool {
        true
    }

    /// Transform a current, successful payload before it is applied.
    fn after_response(&self, _url: &str, _params: &Value, response: Value) -> Value {
        response
    }

    /// Called for every failed request, stale or not.
    fn on_error(&self, _failure: &LoadFailure) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLoadHooks;

impl LoadHooks for DefaultLoadHooks {}

/// Details of a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub ticket: Ticket,
    /// A newer request had been issued by the time this one failed.
    pub stale: bool,
    pub error: TransportError,
}

/// Terminal state of a call to [`LoadPipeline::send_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The payload reached the success callback.
    Applied,
    /// The response arrived after a newer request and was dropped.
    Discarded,
    /// Transport, status or decoding failure.
    Failed,
    /// `before_request` cancelled the request.
    Vetoed,
    /// No url is configured; nothing was sent.
    NoUrl,
    /// Progressive mode: loading was handed to the paginator.
    Deferred,
}

/// Argument to [`LoadPipeline::set_config`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    /// Change only the method.
    Method(String),
    /// Merge a full config over the current one.
    Config(RequestConfig),
}

impl From<&str> for ConfigUpdate {
    fn from(method: &str) -> Self {
        ConfigUpdate::Method(method.to_string())
    }
}

impl From<String> for ConfigUpdate {
    fn from(method: String) -> Self {
        ConfigUpdate::Method(method)
    }
}

impl From<RequestConfig> for ConfigUpdate {
    fn from(config: RequestConfig) -> Self {
        ConfigUpdate::Config(config)
    }
}

struct Shared {
    sequencer: RequestSequencer,
    loading: AtomicBool,
    indicator: watch::Sender<LoaderIndicator>,
    indicator_epoch: AtomicU64,
}

impl Shared {
    fn show(&self, state: LoaderIndicator) -> u64 {
        let epoch = self.indicator_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.indicator.send_replace(state);
        epoch
    }

    fn clear_if(&self, state: LoaderIndicator) {
        self.indicator.send_if_modified(|current| {
            if *current == state {
                *current = LoaderIndicator::Idle;
                true
            } else {
                false
            }
        });
    }

    fn settle(&self, ticket: Ticket) {
        if self.sequencer.is_current(ticket) {
            self.loading.store(false, Ordering::SeqCst);
        }
    }
}

/// Request state plus the dispatch logic around it.
pub struct LoadPipeline {
    transport: Arc<dyn Transport>,
    hooks: Arc<dyn LoadHooks>,
    shared: Arc<Shared>,
    url: Option<String>,
    params: Value,
    config: RequestConfig,
    show_loader: bool,
    error_display: Duration,
    progressive: Option<ProgressiveLoader>,
}

impl LoadPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (indicator, _) = watch::channel(LoaderIndicator::Idle);
        Self {
            transport,
            hooks: Arc::new(DefaultLoadHooks),
            shared: Arc::new(Shared {
                sequencer: RequestSequencer::new(),
                loading: AtomicBool::new(false),
                indicator,
                indicator_epoch: AtomicU64::new(0),
            }),
            url: None,
            params: Value::Object(Map::new()),
            config: RequestConfig::default(),
            show_loader: true,
            error_display: DEFAULT_ERROR_DISPLAY,
            progressive: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn LoadHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.set_url(url);
        self
    }

    // ==================== Request state ====================

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Replace the params, or merge them key by key when `update` is set.
    pub fn set_params(&mut self, params: Value, update: bool) {
        if !update {
            self.params = params;
            return;
        }
        let incoming = match params {
            Value::Object(incoming) => incoming,
            other => {
                tracing::warn!("Ajax params update must be an object, ignoring {}", other);
                return;
            }
        };
        if !self.params.is_object() {
            self.params = Value::Object(Map::new());
        }
        if let Value::Object(current) = &mut self.params {
            current.extend(incoming);
        }
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Change the method, or merge a full config over the current one.
    pub fn set_config(&mut self, update: impl Into<ConfigUpdate>) {
        match update.into() {
            ConfigUpdate::Method(method) => self.config.method = method,
            ConfigUpdate::Config(config) => {
                self.config.method = config.method;
                self.config.headers.extend(config.headers);
                if config.body.is_some() {
                    self.config.body = config.body;
                }
            }
        }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Whether non-silent requests raise the loading indicator.
    pub fn set_show_loader(&mut self, show: bool) {
        self.show_loader = show;
    }

    pub fn set_error_display(&mut self, duration: Duration) {
        self.error_display = duration;
    }

    /// Enable progressive loading. Rejected, with an error logged, when
    /// pagination is also enabled.
    pub fn set_progressive(
        &mut self,
        mode: Option<ProgressiveMode>,
        pagination: bool,
        paginator: Arc<dyn Paginator>,
        scroll_margin: Option<f64>,
    ) {
        self.progressive = ProgressiveLoader::validate(mode, pagination).map(|mode| {
            ProgressiveLoader::new(mode, paginator).with_scroll_margin(scroll_margin)
        });
    }

    pub fn progressive(&self) -> Option<&ProgressiveLoader> {
        self.progressive.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    pub fn indicator(&self) -> LoaderIndicator {
        *self.shared.indicator.borrow()
    }

    /// Watch indicator transitions.
    pub fn subscribe(&self) -> watch::Receiver<LoaderIndicator> {
        self.shared.indicator.subscribe()
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.shared.sequencer
    }

    /// Invalidate any in-flight request. Its response, when it arrives, is
    /// discarded.
    pub fn block_active_request(&self) {
        self.shared.sequencer.block();
        self.shared.loading.store(false, Ordering::SeqCst);
        self.shared.clear_if(LoaderIndicator::Loading);
    }

    /// The final url and config a request would be sent with.
    pub fn build_request(&self) -> Option<(String, RequestConfig)> {
        let url = self.url.as_ref()?;
        let mut config = self.config.clone();
        if is_empty(&self.params) {
            return Some((url.clone(), config));
        }
        if config.is_get() {
            Some((append_query(url, &encode_query(&self.params)), config))
        } else {
            config.body = Some(self.params.to_string());
            Some((url.clone(), config))
        }
    }

    // ==================== Dispatch ====================

    /// Send one request and route its result.
    ///
    /// `on_success` runs only for a current, well-formed response. A
    /// `silent` request never raises the loading indicator.
    pub async fn send_request<F>(&self, on_success: F, silent: bool) -> RequestOutcome
    where
        F: FnOnce(Value),
    {
        let Some((url, config)) = self.build_request() else {
            tracing::warn!("Ajax Load Error - No URL Set");
            return RequestOutcome::NoUrl;
        };
        let base_url = self.url.as_deref().unwrap_or_default();

        let ticket = self.shared.sequencer.issue();

        if !self.hooks.before_request(base_url, &self.params) {
            tracing::debug!(?ticket, "Request vetoed");
            self.shared.loading.store(false, Ordering::SeqCst);
            self.shared.clear_if(LoaderIndicator::Loading);
            return RequestOutcome::Vetoed;
        }

        self.shared.loading.store(true, Ordering::SeqCst);
        if !silent && self.show_loader {
            self.shared.show(LoaderIndicator::Loading);
        }

        tracing::debug!(?ticket, %url, method = %config.method, "Dispatching request");

        let result = match self.transport.fetch(&url, &config).await {
            Ok(response) if response.is_ok() => response.json(),
            Ok(response) => Err(TransportError::Status {
                status: response.status,
                status_text: response.status_text,
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => {
                if !self.shared.sequencer.is_current(ticket) {
                    tracing::warn!(
                        ?ticket,
                        "Ajax Response Blocked - An active request was blocked by an attempt to change table data while the request was being made"
                    );
                    return RequestOutcome::Discarded;
                }
                let data = self.hooks.after_response(base_url, &self.params, data);
                on_success(data);
                self.shared.clear_if(LoaderIndicator::Loading);
                self.shared.settle(ticket);
                RequestOutcome::Applied
            }
            Err(error) => {
                let stale = !self.shared.sequencer.is_current(ticket);
                match &error {
                    TransportError::InvalidJson(_) => {
                        tracing::warn!(?ticket, "Ajax Load Error - {}", error)
                    }
                    _ => tracing::error!(?ticket, "Ajax Load Error - {}", error),
                }
                self.hooks.on_error(&LoadFailure {
                    ticket,
                    stale,
                    error,
                });
                self.show_error();
                self.shared.settle(ticket);
                RequestOutcome::Failed
            }
        }
    }

    fn show_error(&self) {
        let epoch = self.shared.show(LoaderIndicator::Error);
        let shared = Arc::clone(&self.shared);
        let delay = self.error_display;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shared.indicator_epoch.load(Ordering::SeqCst) == epoch {
                shared.clear_if(LoaderIndicator::Error);
            }
        });
    }

    /// Load table data.
    ///
    /// Without a position the sink's rows are replaced; with one, rows are
    /// inserted at that end and the request is silent. In progressive mode
    /// the table is reset and paging takes over.
    pub async fn load_data(
        &self,
        sink: &dyn RowSink,
        position: Option<InsertPosition>,
    ) -> RequestOutcome {
        if let Some(progressive) = &self.progressive {
            progressive.start(sink);
            return RequestOutcome::Deferred;
        }
        self.send_request(|data| sink.set_data(data, position), position.is_some())
            .await
    }

    /// Scroll signal for progressive scroll mode.
    pub fn next_page(&self, diff: f64, viewport_height: f64) -> bool {
        self.progressive
            .as_ref()
            .is_some_and(|p| p.next_page(self.is_loading(), diff, viewport_height))
    }
}

impl fmt::Debug for LoadPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadPipeline")
            .field("url", &self.url)
            .field("params", &self.params)
            .field("config", &self.config)
            .field("loading", &self.is_loading())
            .field("sequence", &self.shared.sequencer.current())
            .field("progressive", &self.progressive)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::transport::{MockTransport, TransportResponse};
    use crate::model::MockRowSink;
    use mockall::predicate::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn pipeline_returning(body: &'static str) -> LoadPipeline {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .returning(move |_, _| Ok(TransportResponse::ok(body)));
        LoadPipeline::new(Arc::new(transport)).with_url("/data")
    }

    #[test]
    fn test_set_params_replace_and_merge() {
        let mut pipeline = LoadPipeline::new(Arc::new(MockTransport::new()));
        pipeline.set_params(json!({"a": 1, "b": 2}), false);
        pipeline.set_params(json!({"b": 3, "c": 4}), true);
        assert_eq!(pipeline.params(), &json!({"a": 1, "b": 3, "c": 4}));

        pipeline.set_params(json!({"z": 0}), false);
        assert_eq!(pipeline.params(), &json!({"z": 0}));
    }

    #[test]
    fn test_set_config_method_and_merge() {
        let mut pipeline = LoadPipeline::new(Arc::new(MockTransport::new()));
        pipeline.set_config("POST");
        assert_eq!(pipeline.config().method, "POST");

        pipeline.set_config(RequestConfig::default().with_method("PUT").with_header("X-Token", "t"));
        assert_eq!(pipeline.config().method, "PUT");
        assert_eq!(pipeline.config().headers.len(), 2);
    }

    #[test]
    fn test_build_request_get_and_post() {
        let mut pipeline = LoadPipeline::new(Arc::new(MockTransport::new())).with_url("/data?v=1");
        pipeline.set_params(json!({"page": 2}), false);
        let (url, config) = pipeline.build_request().unwrap();
        assert_eq!(url, "/data?v=1&page=2");
        assert!(config.body.is_none());

        pipeline.set_config("post");
        let (url, config) = pipeline.build_request().unwrap();
        assert_eq!(url, "/data?v=1");
        assert_eq!(config.body.as_deref(), Some(r#"{"page":2}"#));
    }

    #[tokio::test]
    async fn test_no_url() {
        let pipeline = LoadPipeline::new(Arc::new(MockTransport::new()));
        let outcome = pipeline.send_request(|_| panic!("no data expected"), false).await;
        assert_eq!(outcome, RequestOutcome::NoUrl);
        assert_eq!(pipeline.sequencer().current(), 0);
    }

    #[tokio::test]
    async fn test_success_applies_transformed_payload() {
        let mut hooks = MockLoadHooks::new();
        hooks.expect_before_request().return_const(true);
        hooks
            .expect_after_response()
            .returning(|_, _, data| json!({ "wrapped": data }));
        let pipeline = pipeline_returning(r#"[1,2]"#).with_hooks(Arc::new(hooks));

        let received = Mutex::new(None);
        let outcome = pipeline
            .send_request(|data| *received.lock().unwrap() = Some(data), false)
            .await;

        assert_eq!(outcome, RequestOutcome::Applied);
        assert_eq!(received.into_inner().unwrap(), Some(json!({"wrapped": [1, 2]})));
        assert!(!pipeline.is_loading());
        assert_eq!(pipeline.indicator(), LoaderIndicator::Idle);
    }

    #[tokio::test]
    async fn test_veto_advances_sequence() {
        let mut hooks = MockLoadHooks::new();
        hooks.expect_before_request().return_const(false);
        let pipeline = LoadPipeline::new(Arc::new(MockTransport::new()))
            .with_url("/data")
            .with_hooks(Arc::new(hooks));

        let outcome = pipeline.send_request(|_| panic!("vetoed"), false).await;
        assert_eq!(outcome, RequestOutcome::Vetoed);
        assert_eq!(pipeline.sequencer().current(), 1);
        assert!(!pipeline.is_loading());
    }

    #[tokio::test]
    async fn test_status_error_reports_failure() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .returning(|_, _| Ok(TransportResponse::new(500, "Internal Server Error", "")));
        let mut hooks = MockLoadHooks::new();
        hooks.expect_before_request().return_const(true);
        hooks
            .expect_on_error()
            .withf(|failure| {
                !failure.stale
                    && failure.error
                        == TransportError::Status {
                            status: 500,
                            status_text: "Internal Server Error".to_string(),
                        }
            })
            .times(1)
            .return_const(());

        let pipeline = LoadPipeline::new(Arc::new(transport))
            .with_url("/data")
            .with_hooks(Arc::new(hooks));
        let outcome = pipeline.send_request(|_| panic!("failed"), false).await;

        assert_eq!(outcome, RequestOutcome::Failed);
        assert_eq!(pipeline.indicator(), LoaderIndicator::Error);
        assert!(!pipeline.is_loading());
    }

    #[tokio::test]
    async fn test_invalid_json_is_failure() {
        let pipeline = pipeline_returning("not json");
        let outcome = pipeline.send_request(|_| panic!("invalid"), false).await;
        assert_eq!(outcome, RequestOutcome::Failed);
    }

    #[tokio::test]
    async fn test_positioned_load_is_silent() {
        let pipeline = pipeline_returning(r#"[{"a":1}]"#);
        let rx = pipeline.subscribe();

        let mut sink = MockRowSink::new();
        sink.expect_set_data()
            .with(eq(json!([{"a": 1}])), eq(Some(InsertPosition::Top)))
            .times(1)
            .return_const(());

        let outcome = pipeline.load_data(&sink, Some(InsertPosition::Top)).await;
        assert_eq!(outcome, RequestOutcome::Applied);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_hidden_loader_option() {
        let mut pipeline = pipeline_returning("[]");
        pipeline.set_show_loader(false);
        let rx = pipeline.subscribe();
        pipeline.send_request(|_| {}, false).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_block_without_request() {
        let pipeline = pipeline_returning("[]");
        pipeline.block_active_request();
        assert_eq!(pipeline.sequencer().current(), 1);
        assert_eq!(pipeline.indicator(), LoaderIndicator::Idle);
    }
}
