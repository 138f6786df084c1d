use crate::{CompletionResponse, Error, GenerationOverrides, GenerationParams};

/// A backend that turns a prompt into one or more completions.
///
/// Every implementation returns the same normalized [`CompletionResponse`]
/// regardless of the backend's native response shape.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier this client talks to.
    fn model(&self) -> &str;

    /// Per-instance defaults that call-time overrides are merged onto.
    fn defaults(&self) -> &GenerationParams;

    /// Generate completions for `prompt`. Issues exactly one backend call.
    async fn generate(
        &self,
        prompt: &str,
        overrides: &GenerationOverrides,
    ) -> Result<CompletionResponse, Error>;

    /// Generate and return only the completion texts.
    ///
    /// Requests sampling when more than one completion or a temperature
    /// above 0.1 is asked for.
    async fn complete(
        &self,
        prompt: &str,
        overrides: &GenerationOverrides,
    ) -> Result<Vec<String>, Error> {
        let mut overrides = overrides.clone();
        if overrides.n.unwrap_or(1) > 1 || overrides.temperature.unwrap_or(0.0) > 0.1 {
            overrides.do_sample = Some(true);
        }

        let response = self.generate(prompt, &overrides).await?;
        Ok(response.texts())
    }
}

#[async_trait::async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn defaults(&self) -> &GenerationParams {
        (**self).defaults()
    }

    async fn generate(
        &self,
        prompt: &str,
        overrides: &GenerationOverrides,
    ) -> Result<CompletionResponse, Error> {
        (**self).generate(prompt, overrides).await
    }
}
