use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use domain::{EventRegistry, Storage};
use log::*;
use service::config::Config;
use std::sync::Arc;
use subscription::{StreamSettings, StreamingHandler};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
pub(crate) mod params;
mod router;
mod ws;

pub use error::{Error, Result};

// Web-level state shared by every handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub service_state: service::AppState,
    pub storage: Storage,
    pub registry: Arc<EventRegistry>,
    pub streaming_handler: Arc<StreamingHandler>,
}

impl AppState {
    pub fn new(service_state: service::AppState, storage: Storage) -> Self {
        let settings = StreamSettings {
            write_timeout: service_state.config.ws_write_timeout(),
            batch_period: service_state.config.ws_batch_period(),
        };

        Self {
            service_state,
            storage,
            registry: Arc::new(EventRegistry::new()),
            streaming_handler: Arc::new(StreamingHandler::new(settings)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.service_state.config
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = app_state.config();
    let listen_addr = format!("{}:{}", config.interface(), config.port);

    info!(
        "Server starting... listening for connections on http://{} ({} environment)",
        listen_addr,
        config.runtime_env()
    );

    let listener = TcpListener::bind(&listen_addr).await?;
    let cors_layer = cors_layer(config);

    axum::serve(
        listener,
        router::define_routes(app_state.clone()).layer(cors_layer),
    )
    .with_graceful_shutdown(shutdown_signal(app_state))
    .await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(allowed_origins)
}

/// Resolves on Ctrl-C after every websocket subscriber has been told the server is going away
/// and every fan-out loop has stopped.
async fn shutdown_signal(app_state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {e}");
    }
    info!("Shutdown signal received, closing subscriber connections");

    if let Err(e) = app_state.streaming_handler.shutdown().await {
        warn!("Some subscriber connections did not close cleanly: {e}");
    }
    app_state.registry.shutdown().await;

    info!("Subscriber connections closed");
}
