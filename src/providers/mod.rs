//! Client implementations for different text-generation backends.

pub mod anyscale;
pub mod chat_module;
pub mod tgi;

// Re-export commonly used client types
pub use anyscale::AnyscaleClient;
pub use chat_module::{ChatEngine, ChatEngineConfig, ChatModuleClient};
pub use tgi::{TgiClient, DEFAULT_TGI_URL};
