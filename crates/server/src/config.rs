use std::{path::PathBuf, time::Duration};

use providers::config::{env_parse, Lookup, ServerFileConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONCURRENT_STREAMS: usize = 64;
const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 60_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_concurrent_streams: usize,
    pub stream_idle_timeout: Duration,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env_and_file(file: &ServerFileConfig, lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let host = lookup("HOST")
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env_parse::<u16>(lookup, "PORT")?
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);
        let max_concurrent_streams = env_parse::<usize>(lookup, "MAX_CONCURRENT_STREAMS")?
            .or(file.max_concurrent_streams)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_STREAMS);
        let idle_ms = env_parse::<u64>(lookup, "STREAM_IDLE_TIMEOUT_MS")?
            .or(file.stream_idle_timeout_ms)
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_MS);
        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .or_else(|| file.static_dir.clone());

        if max_concurrent_streams == 0 {
            anyhow::bail!("max_concurrent_streams must be at least 1");
        }
        if idle_ms == 0 {
            anyhow::bail!("stream_idle_timeout_ms must be greater than zero");
        }
        if let Some(dir) = &static_dir {
            if !dir.is_dir() {
                anyhow::bail!("static_dir {} is not a directory", dir.display());
            }
        }

        Ok(Self {
            host,
            port,
            max_concurrent_streams,
            stream_idle_timeout: Duration::from_millis(idle_ms),
            static_dir,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
