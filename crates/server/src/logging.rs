use providers::config::Lookup;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,chatrelay_server=debug,providers=debug";

/// Installs the global subscriber. With `LOG_DIR` set, output goes to a
/// daily rolling file; keep the returned guard alive until exit so the
/// background writer flushes.
pub fn init(lookup: Lookup<'_>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    match lookup("LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "chatrelay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_line_number(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
            Ok(None)
        }
    }
}
