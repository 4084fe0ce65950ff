pub mod client;
pub mod config;

pub use client::GeminiClient;
pub use config::GeminiConfig;
