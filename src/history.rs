//! Call history for any [`LanguageModel`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::provider::LanguageModel;
use crate::{CompletionResponse, Error, GenerationOverrides, GenerationParams};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub response: CompletionResponse,
    /// Parameters after merging overrides onto the defaults.
    pub params: GenerationParams,
    /// Overrides exactly as passed by the caller.
    pub overrides: GenerationOverrides,
}

/// Wraps a model and records every successful call.
pub struct Recorder<M> {
    inner: M,
    history: Mutex<Vec<HistoryEntry>>,
}

impl<M: LanguageModel> Recorder<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    fn entries(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All recorded calls, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.entries().clone()
    }

    /// The most recent `n` calls, oldest first.
    pub fn last(&self, n: usize) -> Vec<HistoryEntry> {
        let entries = self.entries();
        let start = entries.len().saturating_sub(n);
        entries[start..].to_vec()
    }

    pub fn clear_history(&self) {
        self.entries().clear();
    }
}

#[async_trait::async_trait]
impl<M: LanguageModel> LanguageModel for Recorder<M> {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn defaults(&self) -> &GenerationParams {
        self.inner.defaults()
    }

    async fn generate(
        &self,
        prompt: &str,
        overrides: &GenerationOverrides,
    ) -> Result<CompletionResponse, Error> {
        let response = self.inner.generate(prompt, overrides).await?;

        self.entries().push(HistoryEntry {
            prompt: prompt.to_string(),
            response: response.clone(),
            params: self.inner.defaults().merge(overrides),
            overrides: overrides.clone(),
        });

        Ok(response)
    }
}
