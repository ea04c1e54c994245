//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SESSION_KEY;
use crate::core_state::CoreState;
use crate::inventory::MedicationRecord;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// `?session_id=` query shared by every session-scoped route.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

/// Answer to `POST /analyze-medication`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub medications: Vec<MedicationRecord>,
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub low_confidence_count: usize,
    /// Placeholder data returned because no vision provider is configured.
    pub degraded: bool,
}
