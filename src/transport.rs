//! The HTTP seam every network-backed client posts through.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::Error;

/// Default timeout applied to outbound requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A JSON POST request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequest {
    pub url: String,
    /// Stands in for `url` when building the memoization key. Lets callers
    /// that spread load over several endpoints share cache entries.
    pub cache_scope: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            cache_scope: None,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache_scope(mut self, scope: impl Into<String>) -> Self {
        self.cache_scope = Some(scope.into());
        self
    }

    /// Memoization key: scope (or url when unscoped), headers and body.
    pub fn cache_key(&self) -> String {
        let scope = self.cache_scope.as_deref().unwrap_or(&self.url);
        // serde_json maps are ordered, so the rendering is stable
        serde_json::json!({
            "scope": scope,
            "headers": self.headers,
            "body": self.body,
        })
        .to_string()
    }
}

/// The status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a provider error.
    pub fn error_for_status(self, provider: &str) -> Result<Self, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::provider(
                provider,
                format!("API error ({}): {}", self.status, self.body),
            ))
        }
    }

    /// Decode the body as JSON, then as `T`.
    ///
    /// Invalid JSON is a decode failure; valid JSON of the wrong shape is a
    /// schema failure. Both log the raw body.
    pub fn parse<T: DeserializeOwned>(&self, backend: &str) -> Result<T, Error> {
        let value: serde_json::Value = serde_json::from_str(&self.body).map_err(|e| {
            error!(backend, body = %self.body, "Failed to parse JSON response");
            Error::decode(self.body.clone(), e)
        })?;

        serde_json::from_value(value).map_err(|e| {
            error!(backend, body = %self.body, "Unexpected response shape");
            Error::schema(backend, e.to_string())
        })
    }
}

/// Sends a single JSON POST and returns the raw response.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

#[async_trait::async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        (**self).post(request).await
    }
}

/// Network transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        debug!(url = %request.url, "POST");

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(url = %request.url, status, "response received");
        Ok(HttpResponse { status, body })
    }
}
