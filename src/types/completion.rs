use serde::{Deserialize, Serialize};

use crate::Error;

/// One generated continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
}

/// The normalized shape every backend returns:
/// `{"prompt": ..., "choices": [{"text": ...}, ...]}`.
///
/// `choices` is never empty; deserialization enforces the same rule as
/// [`CompletionResponse::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCompletionResponse")]
pub struct CompletionResponse {
    prompt: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct RawCompletionResponse {
    prompt: String,
    choices: Vec<Choice>,
}

impl TryFrom<RawCompletionResponse> for CompletionResponse {
    type Error = Error;

    fn try_from(raw: RawCompletionResponse) -> Result<Self, Error> {
        Self::new(raw.prompt, raw.choices.into_iter().map(|c| c.text))
    }
}

impl CompletionResponse {
    /// Build a response from completion texts. At least one text is required.
    pub fn new<I, S>(prompt: impl Into<String>, completions: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<Choice> = completions
            .into_iter()
            .map(|text| Choice { text: text.into() })
            .collect();

        if choices.is_empty() {
            return Err(Error::InvalidResponse(
                "backend returned no completions".to_string(),
            ));
        }

        Ok(Self {
            prompt: prompt.into(),
            choices,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Completion texts in order.
    pub fn texts(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.text.clone()).collect()
    }

    /// The primary completion.
    pub fn first_text(&self) -> &str {
        // non-empty by construction
        self.choices.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_to_common_shape() {
        let response = CompletionResponse::new("Hello", ["world", "there"]).unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "prompt": "Hello",
                "choices": [{ "text": "world" }, { "text": "there" }]
            })
        );
    }

    #[test]
    fn test_empty_choices_rejected() {
        let result = CompletionResponse::new("Hello", Vec::<String>::new());
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_deserialize_rejects_empty_choices() {
        let result: Result<CompletionResponse, _> =
            serde_json::from_value(json!({ "prompt": "Hello", "choices": [] }));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("no completions"));
    }

    #[test]
    fn test_deserialize_keeps_prompt_and_choices() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "prompt": "Hello",
            "choices": [{ "text": "world" }]
        }))
        .unwrap();
        assert_eq!(response.prompt(), "Hello");
        assert_eq!(response.choices(), &[Choice { text: "world".into() }]);
    }

    #[test]
    fn test_texts_preserve_order() {
        let response = CompletionResponse::new("p", ["a", "b", "c"]).unwrap();
        assert_eq!(response.texts(), vec!["a", "b", "c"]);
        assert_eq!(response.first_text(), "a");
    }
}
