//! Gemini generation service integration layer.
//!
//! Streaming client, request-rate accounting, and wire types for the
//! remote generation service.

pub mod client;
pub mod rate_limiter;
pub mod types;


pub use client::{GeminiTransport, GenerationClient, GenerationTransport};
pub use rate_limiter::RequestWindow;
pub use types::*;
