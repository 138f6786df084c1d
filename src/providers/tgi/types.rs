use serde::{Deserialize, Serialize};

/// Body of a `POST /generate` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub inputs: String,
    pub parameters: GenerateParameters,
}

/// Sampling parameters in text-generation-inference vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateParameters {
    pub do_sample: bool,
    pub best_of: u32,
    pub details: bool,
    pub max_new_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversity_penalty: Option<f64>,
}

/// Response of `POST /generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub generated_text: String,
    #[serde(default)]
    pub details: Option<GenerateDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateDetails {
    #[serde(default)]
    pub best_of_sequences: Option<Vec<BestOfSequence>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BestOfSequence {
    pub generated_text: String,
}

impl GenerateResponse {
    /// Primary generation first, then every best-of sequence in order.
    pub fn into_completions(self) -> Vec<String> {
        let mut completions = vec![self.generated_text];
        if let Some(sequences) = self.details.and_then(|d| d.best_of_sequences) {
            completions.extend(sequences.into_iter().map(|s| s.generated_text));
        }
        completions
    }
}
