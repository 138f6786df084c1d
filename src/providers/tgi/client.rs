use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::debug;

use super::types::{GenerateParameters, GenerateRequest, GenerateResponse};
use crate::cache::{CacheStore, InMemoryStore, MemoizedTransport};
use crate::provider::LanguageModel;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::{CompletionResponse, Error, GenerationOverrides, GenerationParams};

/// Host used when no url is configured.
pub const DEFAULT_TGI_URL: &str = "http://future-hgx-1";

/// TGI rejects temperatures at or near zero.
const MIN_TEMPERATURE: f64 = 0.1;

const BACKEND: &str = "TGI";

/// Client for a self-hosted text-generation-inference server.
///
/// The server may listen on several ports; each call picks one at random.
pub struct TgiClient {
    // `base` wrapped in one memoizing layer per entry of `caches`
    transport: Arc<dyn HttpTransport>,
    base: Arc<dyn HttpTransport>,
    caches: Vec<Arc<dyn CacheStore>>,
    model: String,
    url: String,
    ports: Vec<u16>,
    params: GenerationParams,
}

impl TgiClient {
    /// Create a client for `model` served on `ports` at [`DEFAULT_TGI_URL`].
    pub fn new(model: impl Into<String>, ports: Vec<u16>) -> Result<Self, Error> {
        if ports.is_empty() {
            return Err(Error::config("TGI client needs at least one port"));
        }

        let base: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self {
            transport: base.clone(),
            base,
            caches: Vec::new(),
            model: model.into(),
            url: DEFAULT_TGI_URL.to_string(),
            ports,
            params: Self::default_params(),
        })
    }

    /// Defaults applied before call-time overrides.
    pub fn default_params() -> GenerationParams {
        GenerationParams {
            temperature: 0.01,
            max_tokens: 75,
            top_p: Some(0.97),
            n: 1,
            stop: vec!["\n".to_string(), "\n\n".to_string()],
            ..GenerationParams::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Send requests with a fresh HTTP client using `timeout`.
    ///
    /// Caches already attached stay in place.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, Error> {
        Ok(self.with_transport(Arc::new(ReqwestTransport::with_timeout(timeout)?)))
    }

    /// Replace the innermost transport. Caches already attached stay in place.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.base = transport;
        self.layered()
    }

    /// Memoize requests in `store`, in front of any cache already attached.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.caches.push(store);
        self.layered()
    }

    /// Memoize through a general store with an interactive store in front.
    pub fn with_caches(
        self,
        interactive: Arc<dyn CacheStore>,
        general: Arc<dyn CacheStore>,
    ) -> Self {
        self.with_cache(general).with_cache(interactive)
    }

    /// Attach a fresh interactive and general [`InMemoryStore`] pair.
    pub fn with_default_caches(self) -> Self {
        self.with_caches(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Stores attached by [`with_cache`](Self::with_cache), innermost first.
    pub fn caches(&self) -> &[Arc<dyn CacheStore>] {
        &self.caches
    }

    fn layered(mut self) -> Self {
        self.transport = self.caches.iter().fold(self.base.clone(), |inner, store| {
            Arc::new(MemoizedTransport::new(inner, store.clone())) as Arc<dyn HttpTransport>
        });
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Translate merged parameters into the TGI request body.
    pub(crate) fn build_request(prompt: &str, params: &GenerationParams) -> GenerateRequest {
        let sampling = params.n > 1;

        GenerateRequest {
            inputs: prompt.to_string(),
            parameters: GenerateParameters {
                do_sample: params.do_sample.unwrap_or(sampling),
                best_of: params.n,
                details: sampling,
                max_new_tokens: params.max_tokens,
                temperature: params.temperature.max(MIN_TEMPERATURE),
                top_p: params.top_p,
                stop: params.stop.clone(),
                repetition_penalty: params.frequency_penalty.map(|p| 1.0 - p),
                diversity_penalty: params.presence_penalty,
            },
        }
    }

    /// Identifies this server for memoization regardless of the chosen port.
    fn cache_scope(&self) -> String {
        let ports: Vec<String> = self.ports.iter().map(u16::to_string).collect();
        format!("{}|{}", self.url, ports.join(","))
    }

    fn pick_port(&self) -> Result<u16, Error> {
        let mut rng = rand::thread_rng();
        self.ports
            .choose(&mut rng)
            .copied()
            .ok_or_else(|| Error::config("TGI client needs at least one port"))
    }
}

#[async_trait::async_trait]
impl LanguageModel for TgiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn defaults(&self) -> &GenerationParams {
        &self.params
    }

    async fn generate(
        &self,
        prompt: &str,
        overrides: &GenerationOverrides,
    ) -> Result<CompletionResponse, Error> {
        let params = self.params.merge(overrides);
        let body = serde_json::to_value(Self::build_request(prompt, &params))
            .map_err(|e| Error::config(format!("unserializable TGI request: {e}")))?;

        let port = self.pick_port()?;
        let request = HttpRequest::new(format!("{}:{}/generate", self.url, port), body)
            .with_header("Content-Type", "application/json")
            .with_cache_scope(self.cache_scope());

        debug!(model = %self.model, port, n = params.n, "TGI generate");
        let response = self.transport.post(&request).await?.error_for_status(BACKEND)?;

        let parsed: GenerateResponse = response.parse(BACKEND)?;
        CompletionResponse::new(prompt, parsed.into_completions())
    }
}
