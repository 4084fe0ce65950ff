use std::time::Duration;

use crate::config::{proxy_from_env, Lookup, ProviderFileConfig};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Bound on sending the request and receiving response headers.
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// The key is mandatory: the server refuses to start without it.
    pub fn from_env_and_file(file: &ProviderFileConfig, lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let api_key =
            lookup("OPENAI_API_KEY").ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
        let base_url = lookup("OPENAI_BASE_URL")
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = lookup("OPENAI_MODEL")
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_ms = file.timeout_ms.unwrap_or(30_000);

        Ok(OpenAiConfig {
            api_key,
            base_url,
            model,
            timeout: Duration::from_millis(timeout_ms),
            proxy: proxy_from_env(lookup),
        })
    }
}
