//! Self-hosted text-generation-inference servers.

pub mod client;
pub mod types;

pub use client::{TgiClient, DEFAULT_TGI_URL};
