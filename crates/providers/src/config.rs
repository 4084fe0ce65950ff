use anyhow::Context;
use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, str::FromStr};

/// Environment lookup; `std::env::var` in production, a map in tests.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Contents of `config.toml`. Every field is optional; environment
/// variables override whatever is set here.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub openai: ProviderFileConfig,
    #[serde(default)]
    pub gemini: ProviderFileConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_concurrent_streams: Option<usize>,
    pub stream_idle_timeout_ms: Option<u64>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderFileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Reads `$CHATRELAY_CONFIG` or the per-user default path. A missing
    /// default file is fine; an explicit path that does not exist, or any
    /// file that fails to parse, is an error.
    pub fn load(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let (path, explicit) = match lookup("CHATRELAY_CONFIG") {
            Some(p) => (PathBuf::from(p), true),
            None => match Self::config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            if explicit {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".chatrelay").join("config.toml")
        } else {
            base.config_dir().join("chatrelay").join("config.toml")
        };
        Some(p)
    }
}

/// Parses an optional env value, failing loudly on garbage.
pub fn env_parse<T>(lookup: Lookup<'_>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
    }
}

pub fn proxy_from_env(lookup: Lookup<'_>) -> Option<String> {
    lookup("HTTPS_PROXY").or_else(|| lookup("HTTP_PROXY"))
}
