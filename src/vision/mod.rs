//! External vision capability: "given an image and a prompt, return text".
//!
//! The pipeline only sees the `VisionClient` trait. Concrete providers live in
//! submodules and are picked from configuration by `build_vision_client`.

pub mod gemini;
pub mod mock;
pub mod ollama;

pub use gemini::GeminiClient;
pub use mock::MockVisionClient;
pub use ollama::OllamaVisionClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{VisionConfig, VisionProvider};

/// Errors raised by a vision provider.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Vision service is not reachable at {0}")]
    NotReachable(String),

    #[error("Vision service returned an error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Vision request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected vision response: {0}")]
    ResponseParsing(String),

    #[error("Vision service returned no text")]
    EmptyResponse,
}

impl VisionError {
    /// Map a transport error the way every provider does.
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            VisionError::Timeout(timeout)
        } else if err.is_connect() {
            VisionError::NotReachable(base_url.to_string())
        } else {
            VisionError::Network(err.to_string())
        }
    }
}

/// Multimodal model abstraction (allows mocking).
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send one image and one instruction, return the model's raw text.
    async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, VisionError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Build the configured provider, or `None` when nothing is configured.
pub fn build_vision_client(
    config: &VisionConfig,
) -> Result<Option<Arc<dyn VisionClient>>, VisionError> {
    let client: Arc<dyn VisionClient> = match &config.provider {
        VisionProvider::None => return Ok(None),
        VisionProvider::Gemini {
            api_key,
            model,
            base_url,
        } => Arc::new(GeminiClient::new(base_url, api_key, model, config.timeout)?),
        VisionProvider::Ollama { model, base_url } => {
            Arc::new(OllamaVisionClient::new(base_url, model, config.timeout)?)
        }
    };
    tracing::info!(
        provider = config.provider.label(),
        model = client.model_name(),
        "Vision provider configured"
    );
    Ok(Some(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_provider_builds_nothing() {
        let config = VisionConfig {
            provider: VisionProvider::None,
            timeout: Duration::from_secs(1),
        };
        assert!(build_vision_client(&config).unwrap().is_none());
    }

    #[test]
    fn ollama_provider_builds_client() {
        let config = VisionConfig {
            provider: VisionProvider::Ollama {
                model: "llava".into(),
                base_url: "http://localhost:11434/".into(),
            },
            timeout: Duration::from_secs(1),
        };
        let client = build_vision_client(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "llava");
    }

    #[test]
    fn gemini_provider_builds_client() {
        let config = VisionConfig {
            provider: VisionProvider::Gemini {
                api_key: "k".into(),
                model: "gemini-1.5-flash".into(),
                base_url: "https://generativelanguage.googleapis.com".into(),
            },
            timeout: Duration::from_secs(1),
        };
        let client = build_vision_client(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "gemini-1.5-flash");
    }
}
