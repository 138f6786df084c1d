//! Uniform text generation over several language-model backends.
//!
//! Each client turns a prompt into the request format of its backend (a
//! text-generation-inference server, a hosted chat-completions API, or an
//! in-process chat engine) and normalizes the reply into one
//! [`CompletionResponse`] shape. Outbound HTTP can be memoized through
//! [`MemoizedTransport`].

pub mod cache;
pub mod error;
pub mod factory;
pub mod history;
pub mod provider;
pub mod providers;
pub mod transport;
pub mod types;

// Re-export core types for easy usage
pub use cache::{CacheStore, InMemoryStore, MemoizedTransport};
pub use error::Error;
pub use factory::{BackendConfig, BackendType, ClientFactory};
pub use history::{HistoryEntry, Recorder};
pub use provider::LanguageModel;
pub use providers::*;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::*;
