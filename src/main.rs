use std::sync::Arc;

use qbwc_bridge::app::build_from_config;
use qbwc_bridge::logging::init_logging;
use qbwc_bridge::{BridgeError, ServerConfig};
use qbwc_soap::create_router;

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    init_logging();
    let cfg = ServerConfig::from_env()?;

    // El pool de Postgres conecta y migra de forma síncrona.
    let build_cfg = cfg.clone();
    let engine = tokio::task::spawn_blocking(move || build_from_config(&build_cfg)).await
                                                                                    .map_err(|e| BridgeError::Config(format!("startup task: {e}")))??;
    tracing::info!(server_version = %engine.server_version(), steps = ?engine.registry().names(), "engine built");

    let router = create_router(Arc::new(engine), &cfg.soap_path);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("listening on http://{}{}", cfg.bind_addr, cfg.soap_path);
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal())
                                 .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("could not listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
