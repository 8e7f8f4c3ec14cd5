mod config;
mod controller;
mod logging;
mod params;
mod router;
mod state;

use crate::config::Config;
use crate::logging::Logger;
use crate::state::AppState;
use log::*;
use sse::Handler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    Logger::init_logger(&config);

    let handler = Arc::new(Handler::new());
    let shutdown = CancellationToken::new();
    let app_state = AppState::new(handler, shutdown.clone());

    let listen_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("sse-relay listening on {listen_addr}");

    axum::serve(listener, router::define_routes(app_state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, aborting in-flight broadcasts");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
