use std::{collections::HashMap, sync::Arc};

use relay_core::llm::ModelClient;
use relay_core::{ChatError, ProviderKind};
use tracing::info;

use crate::config::{FileConfig, Lookup};
use crate::gemini::{GeminiClient, GeminiConfig};
use crate::openai::{OpenAiClient, OpenAiConfig};

/// Configured upstreams, keyed by selector. Built once at startup and
/// shared read-only between requests.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderKind, Arc<dyn ModelClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ProviderKind, client: Arc<dyn ModelClient>) -> Self {
        self.clients.insert(kind, client);
        self
    }

    /// OpenAI is mandatory; Gemini is registered only when its key is set.
    pub fn from_config(file: &FileConfig, lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let openai = OpenAiClient::new(OpenAiConfig::from_env_and_file(&file.openai, lookup)?)?;
        info!(target:"providers","registered openai model={}", openai.model());
        let mut registry = Self::new().with(ProviderKind::OpenAi, Arc::new(openai));

        match GeminiConfig::from_env_and_file(&file.gemini, lookup) {
            Some(cfg) => {
                info!(target:"providers","registered gemini model={}", cfg.model);
                registry = registry.with(ProviderKind::Gemini, Arc::new(GeminiClient::new(cfg)?));
            }
            None => info!(target:"providers","gemini disabled (GEMINI_API_KEY not set)"),
        }
        Ok(registry)
    }

    pub fn resolve(&self, kind: ProviderKind) -> Result<Arc<dyn ModelClient>, ChatError> {
        self.clients.get(&kind).cloned().ok_or_else(|| {
            ChatError::UnknownProvider(format!("provider '{kind}' is not configured"))
        })
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.clients.contains_key(k))
            .collect()
    }
}
