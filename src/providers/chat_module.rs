//! In-process chat engines.
//!
//! No network is involved: the engine is loaded once and each call hands the
//! prompt to it on a blocking worker thread.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::provider::LanguageModel;
use crate::{CompletionResponse, Error, GenerationOverrides, GenerationParams};

/// Conversation template used when none is given.
pub const DEFAULT_CONV_TEMPLATE: &str = "LM";

/// What an engine needs to load a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEngineConfig {
    pub model: String,
    pub lib_path: PathBuf,
    pub conv_template: String,
}

impl ChatEngineConfig {
    pub fn new(model: impl Into<String>, lib_path: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            lib_path: lib_path.into(),
            conv_template: DEFAULT_CONV_TEMPLATE.to_string(),
        }
    }

    pub fn with_conv_template(mut self, template: impl Into<String>) -> Self {
        self.conv_template = template.into();
        self
    }
}

/// A locally loaded chat model.
pub trait ChatEngine: Send + Sync + 'static {
    /// Load the engine described by `config`.
    fn load(config: &ChatEngineConfig) -> Result<Self, Error>
    where
        Self: Sized;

    /// Produce a single continuation of `prompt`. May block.
    fn generate(&self, prompt: &str) -> Result<String, Error>;

    /// Sampling configuration the engine was loaded with.
    ///
    /// Engines that know their own settings should report them here; the
    /// client exposes them through [`LanguageModel::defaults`].
    fn params(&self) -> GenerationParams {
        GenerationParams::default()
    }
}

/// Adapter exposing a [`ChatEngine`] as a [`LanguageModel`].
pub struct ChatModuleClient<E> {
    engine: Arc<E>,
    config: ChatEngineConfig,
    params: GenerationParams,
}

impl<E: ChatEngine> ChatModuleClient<E> {
    /// Load `model` from the compiled library at `lib_path`.
    pub fn load(model: impl Into<String>, lib_path: impl Into<PathBuf>) -> Result<Self, Error> {
        Self::load_with_config(ChatEngineConfig::new(model, lib_path))
    }

    pub fn load_with_config(config: ChatEngineConfig) -> Result<Self, Error> {
        let engine = E::load(&config)?;
        Ok(Self::from_engine(engine, config))
    }

    /// Wrap an engine that is already loaded.
    pub fn from_engine(engine: E, config: ChatEngineConfig) -> Self {
        let params = engine.params();
        Self {
            engine: Arc::new(engine),
            config,
            params,
        }
    }

    pub fn config(&self) -> &ChatEngineConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl<E: ChatEngine> LanguageModel for ChatModuleClient<E> {
    fn model(&self) -> &str {
        &self.config.model
    }

    /// What the engine reports via [`ChatEngine::params`]. Call-time
    /// overrides never reach the engine, so these are the settings every
    /// call actually runs with.
    fn defaults(&self) -> &GenerationParams {
        &self.params
    }

    /// Sampling parameters are not forwarded; the engine uses its own
    /// configuration.
    async fn generate(
        &self,
        prompt: &str,
        _overrides: &GenerationOverrides,
    ) -> Result<CompletionResponse, Error> {
        debug!(model = %self.config.model, "chat module generate");

        let engine = Arc::clone(&self.engine);
        let input = prompt.to_string();
        let output = tokio::task::spawn_blocking(move || engine.generate(&input))
            .await
            .map_err(|e| Error::backend(format!("chat engine task failed: {e}")))?
            .inspect_err(|e| error!(model = %self.config.model, error = %e, "Chat engine failed"))?;

        CompletionResponse::new(prompt, [output])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoEngine {
        suffix: String,
    }

    impl ChatEngine for EchoEngine {
        fn load(config: &ChatEngineConfig) -> Result<Self, Error> {
            Ok(Self {
                suffix: format!(" [{}]", config.conv_template),
            })
        }

        fn generate(&self, prompt: &str) -> Result<String, Error> {
            Ok(format!("{prompt}{}", self.suffix))
        }
    }

    struct BrokenEngine;

    impl ChatEngine for BrokenEngine {
        fn load(_config: &ChatEngineConfig) -> Result<Self, Error> {
            Ok(BrokenEngine)
        }

        fn generate(&self, _prompt: &str) -> Result<String, Error> {
            Err(Error::backend("out of memory"))
        }
    }

    struct TunedEngine;

    impl ChatEngine for TunedEngine {
        fn load(_config: &ChatEngineConfig) -> Result<Self, Error> {
            Ok(TunedEngine)
        }

        fn generate(&self, prompt: &str) -> Result<String, Error> {
            Ok(prompt.to_uppercase())
        }

        fn params(&self) -> GenerationParams {
            GenerationParams {
                temperature: 0.7,
                max_tokens: 512,
                top_p: Some(0.95),
                ..GenerationParams::default()
            }
        }
    }

    #[test]
    fn test_defaults_come_from_engine() {
        let client = ChatModuleClient::<TunedEngine>::load("m", "lib.so").unwrap();
        assert_eq!(client.defaults().temperature, 0.7);
        assert_eq!(client.defaults().max_tokens, 512);
        assert_eq!(client.defaults().top_p, Some(0.95));

        let plain = ChatModuleClient::<EchoEngine>::load("m", "lib.so").unwrap();
        assert_eq!(plain.defaults(), &GenerationParams::default());
    }

    #[test]
    fn test_config_defaults_to_lm_template() {
        let config = ChatEngineConfig::new("Llama-2-7b-chat", "dist/lib.so");
        assert_eq!(config.conv_template, "LM");
        assert_eq!(config.lib_path, PathBuf::from("dist/lib.so"));
    }

    #[tokio::test]
    async fn test_single_choice_from_engine_output() {
        let client = ChatModuleClient::<EchoEngine>::load("Llama-2-7b-chat", "dist/lib.so").unwrap();
        let response = client
            .generate("Hello", &GenerationOverrides::default())
            .await
            .unwrap();

        assert_eq!(response.prompt(), "Hello");
        assert_eq!(response.texts(), vec!["Hello [LM]"]);
        assert_eq!(client.model(), "Llama-2-7b-chat");
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces() {
        let client = ChatModuleClient::<BrokenEngine>::load("m", "lib.so").unwrap();
        let result = client.generate("Hello", &GenerationOverrides::default()).await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
