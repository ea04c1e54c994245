pub mod api;
pub mod config;
pub mod core_state;
pub mod inventory;
pub mod pipeline;
pub mod vision;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Boot the service and serve until Ctrl-C.
pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env().map_err(|e| e.to_string())?;
    tracing::info!(
        bind = %app_config.bind_addr,
        provider = app_config.vision.provider.label(),
        timeout_secs = app_config.vision.timeout.as_secs(),
        max_image_bytes = app_config.image.max_bytes,
        min_confidence = app_config.validation.min_confidence,
        max_detections = app_config.validation.max_detections,
        demo_mode = app_config.demo_mode,
        "Configuration loaded"
    );

    let bind_addr = app_config.bind_addr;
    let core = Arc::new(core_state::CoreState::from_config(app_config).map_err(|e| e.to_string())?);
    let server = api::start_api_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.stop().await;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
