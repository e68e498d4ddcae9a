use domain::Storage;
use log::*;
use service::{config::Config, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "Sensor telemetry service starting in {} mode",
        config.runtime_env()
    );

    let app_state = web::AppState::new(AppState::new(config), Storage::in_memory());

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with error: {e}");
        std::process::exit(1);
    }

    info!("Server stopped");
}
