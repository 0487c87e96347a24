//! The fetch abstraction the load pipeline talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Errors produced by a transport or while decoding its response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection error: {status} {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Invalid JSON returned: {0}")]
    InvalidJson(String),
}

/// Request options handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        Self {
            method: DEFAULT_METHOD.to_string(),
            headers,
            body: None,
        }
    }
}

impl RequestConfig {
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// GET puts params in the query string, every other method in the body.
    pub fn is_get(&self) -> bool {
        self.method.is_empty() || self.method.eq_ignore_ascii_case("get")
    }
}

/// What came back from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, "OK", body)
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::InvalidJson(e.to_string()))
    }
}

/// Performs a single request. Implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<TransportResponse, TransportError>;
}
