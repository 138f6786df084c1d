//! Hosted OpenAI-compatible chat-completions endpoints.

pub mod client;
pub mod types;

pub use client::AnyscaleClient;
