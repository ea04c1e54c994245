//! Process-wide application state shared by every HTTP handler.
//!
//! Built once at startup from `AppConfig` and wrapped in an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppConfig, ConfigError};
use crate::inventory::SessionStore;
use crate::pipeline::{ExtractionClient, ExtractionPipeline};
use crate::vision::{build_vision_client, VisionClient, VisionError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Vision client setup failed: {0}")]
    Vision(#[from] VisionError),
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    store: Arc<SessionStore>,
    pipeline: ExtractionPipeline,
    started_at: Instant,
}

impl CoreState {
    /// Build state with the provider named in `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let vision = build_vision_client(&config.vision)?;
        Ok(Self::with_vision(config, vision))
    }

    /// Build state around an explicit vision client (or none).
    pub fn with_vision(config: AppConfig, vision: Option<Arc<dyn VisionClient>>) -> Self {
        if vision.is_none() {
            tracing::warn!(
                demo_mode = config.demo_mode,
                "No vision provider configured; analysis requests will be refused"
            );
        }
        let store = Arc::new(SessionStore::new());
        let client = ExtractionClient::new(
            vision,
            config.image.clone(),
            &config.validation,
            config.vision.timeout,
        );
        let pipeline = ExtractionPipeline::new(client, store.clone(), config.validation.clone());
        Self {
            config,
            store,
            pipeline,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.pipeline
    }

    pub fn vision_available(&self) -> bool {
        self.pipeline.client().is_available()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
