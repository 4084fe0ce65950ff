use std::time::Duration;

use crate::config::{proxy_from_env, Lookup, ProviderFileConfig};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    /// `None` when `GEMINI_API_KEY` is unset; Gemini is optional.
    pub fn from_env_and_file(file: &ProviderFileConfig, lookup: Lookup<'_>) -> Option<Self> {
        let api_key = lookup("GEMINI_API_KEY")?;
        let base_url = lookup("GEMINI_BASE_URL")
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = lookup("GEMINI_MODEL")
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Some(GeminiConfig {
            api_key,
            base_url,
            model,
            timeout: Duration::from_millis(file.timeout_ms.unwrap_or(30_000)),
            proxy: proxy_from_env(lookup),
        })
    }
}
