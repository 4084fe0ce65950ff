use std::sync::Arc;

use anyhow::{Context, Result};
use chatrelay_server::{logging, router, ChatProxy, ServerConfig};
use providers::config::{process_env, FileConfig, Lookup};
use providers::ProviderRegistry;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let lookup: Lookup<'_> = &process_env;
    let _log_guard = logging::init(lookup)?;

    let file = FileConfig::load(lookup)?;
    let cfg = ServerConfig::from_env_and_file(&file.server, lookup)?;
    let registry = ProviderRegistry::from_config(&file, lookup)?;
    info!(
        "providers: {:?}, max streams {}, idle timeout {:?}",
        registry.kinds(),
        cfg.max_concurrent_streams,
        cfg.stream_idle_timeout
    );

    let proxy = Arc::new(ChatProxy::new(
        registry,
        cfg.max_concurrent_streams,
        cfg.stream_idle_timeout,
    ));
    let app = router(proxy, cfg.static_dir.as_deref());

    let listener = TcpListener::bind(cfg.addr())
        .await
        .with_context(|| format!("binding {}", cfg.addr()))?;
    info!("chatrelay listening on http://{}", listener.local_addr()?);
    if let Some(dir) = &cfg.static_dir {
        info!("serving static files from {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("chatrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("ctrl-c handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
