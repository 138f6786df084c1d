use std::env;
use std::sync::Arc;

use tracing::{debug, error};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::cache::{CacheStore, MemoizedTransport};
use crate::provider::LanguageModel;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::types::Message;
use crate::{CompletionResponse, Error, GenerationOverrides, GenerationParams};

/// Instruction sent ahead of every prompt so the model continues the text
/// instead of answering it.
pub const CONTINUATION_INSTRUCTION: &str =
    "You are a helpful assistant. You must continue the user text directly without *any* additional interjections.";

const BACKEND: &str = "Anyscale";

/// Client for a hosted OpenAI-compatible chat-completions API.
pub struct AnyscaleClient {
    // `base` wrapped in one memoizing layer per entry of `caches`
    transport: Arc<dyn HttpTransport>,
    base: Arc<dyn HttpTransport>,
    caches: Vec<Arc<dyn CacheStore>>,
    model: String,
    api_base: String,
    api_key: String,
    params: GenerationParams,
}

impl AnyscaleClient {
    /// Create a new client.
    pub fn new(
        model: impl Into<String>,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, Error> {
        let base: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self {
            transport: base.clone(),
            base,
            caches: Vec::new(),
            model: model.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            params: Self::default_params(),
        })
    }

    /// Create a client reading `OPENAI_API_BASE` and `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, Error> {
        let api_base = env::var("OPENAI_API_BASE").map_err(|_| {
            Error::config("OPENAI_API_BASE environment variable is required for Anyscale")
        })?;
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            Error::config("OPENAI_API_KEY environment variable is required for Anyscale")
        })?;
        Self::new(model, api_base, api_key)
    }

    pub fn default_params() -> GenerationParams {
        GenerationParams {
            temperature: 0.0,
            max_tokens: 150,
            n: 1,
            ..GenerationParams::default()
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the innermost transport. Caches already attached stay in place.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.base = transport;
        self.layered()
    }

    /// Memoize requests in `store`.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.caches.push(store);
        self.layered()
    }

    fn layered(mut self) -> Self {
        self.transport = self.caches.iter().fold(self.base.clone(), |inner, store| {
            Arc::new(MemoizedTransport::new(inner, store.clone())) as Arc<dyn HttpTransport>
        });
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(CONTINUATION_INSTRUCTION),
                Message::user(prompt),
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for AnyscaleClient {
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
        let body = serde_json::to_value(self.build_request(prompt, &params))
            .map_err(|e| Error::config(format!("unserializable chat request: {e}")))?;

        let request = HttpRequest::new(format!("{}/chat/completions", self.api_base), body)
            .with_header("Authorization", format!("Bearer {}", self.api_key))
            .with_header("Content-Type", "application/json");

        debug!(model = %self.model, "chat completion");
        let response = self.transport.post(&request).await?.error_for_status(BACKEND)?;

        let parsed: ChatCompletionResponse = response.parse(BACKEND)?;
        let first = parsed.choices.into_iter().next().ok_or_else(|| {
            error!(body = %response.body, "Chat completion returned no choices");
            Error::schema(BACKEND, "response has no choices")
        })?;

        CompletionResponse::new(prompt, [first.message.content.unwrap_or_default()])
    }
}
