pub mod config;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod registry;
pub mod sse;

pub use registry::ProviderRegistry;
