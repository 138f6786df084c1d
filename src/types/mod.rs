//! Core types used throughout the library.

pub mod completion;
pub mod config;
pub mod message;

// Re-export commonly used types
pub use completion::*;
pub use config::*;
pub use message::*;
