use thiserror::Error;

/// Errors that can occur when calling a language-model backend.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Received invalid JSON response from server: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response shape from {backend}: {message}")]
    Schema { backend: String, message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn schema(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn decode(body: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode {
            body: body.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// True for failures that happened after a response was received but
    /// could not be turned into completions.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::Schema { .. } | Error::InvalidResponse(_)
        )
    }
}
