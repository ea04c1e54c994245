//! Wrapper around the external vision capability.
//!
//! Enforces intake policy, attaches the extraction prompt, bounds the call
//! with a timeout and maps provider errors onto the pipeline taxonomy.
//! Exactly one outbound call per `extract`, no retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::ImageFormat;
use tracing::Instrument;

use super::prompt::build_extraction_prompt;
use super::{InputError, PipelineError};
use crate::config::{ImagePolicy, ValidationPolicy};
use crate::vision::{VisionClient, VisionError};

pub struct ExtractionClient {
    vision: Option<Arc<dyn VisionClient>>,
    policy: ImagePolicy,
    prompt: String,
    timeout: Duration,
}

impl ExtractionClient {
    pub fn new(
        vision: Option<Arc<dyn VisionClient>>,
        policy: ImagePolicy,
        validation: &ValidationPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            vision,
            policy,
            prompt: build_extraction_prompt(validation.max_detections),
            timeout,
        }
    }

    /// Whether a vision provider is configured at all.
    pub fn is_available(&self) -> bool {
        self.vision.is_some()
    }

    /// Normalize `mime_type` and check it against the allow-list.
    pub fn check_mime_type(&self, mime_type: &str) -> Result<String, PipelineError> {
        let normalized = normalize_mime_type(mime_type);
        let allowed = self
            .policy
            .allowed_mime_types
            .iter()
            .any(|m| normalize_mime_type(m) == normalized);
        if !allowed {
            return Err(InputError::UnsupportedMimeType(mime_type.to_string()).into());
        }
        Ok(normalized)
    }

    /// Full intake check: type, size, and that the bytes match the type.
    pub fn check_image(&self, image: &[u8], mime_type: &str) -> Result<String, PipelineError> {
        let mime = self.check_mime_type(mime_type)?;
        if image.is_empty() {
            return Err(InputError::EmptyImage.into());
        }
        if image.len() > self.policy.max_bytes {
            return Err(InputError::TooLarge {
                size: image.len(),
                max: self.policy.max_bytes,
            }
            .into());
        }
        let detected = sniff_mime_type(image).ok_or(InputError::NotAnImage)?;
        if detected != mime {
            return Err(InputError::ContentMismatch {
                declared: mime,
                detected: detected.to_string(),
            }
            .into());
        }
        Ok(mime)
    }

    /// Send the image to the vision model and return its raw reply.
    pub async fn extract(&self, image: &[u8], mime_type: &str) -> Result<String, PipelineError> {
        let mime = self.check_image(image, mime_type)?;
        let vision = self.vision.as_ref().ok_or_else(|| {
            PipelineError::ServiceUnavailable("no vision provider is configured".into())
        })?;

        let span = tracing::info_span!(
            "vision_call",
            model = vision.model_name(),
            mime = %mime,
            image_bytes = image.len()
        );
        let start = Instant::now();
        let reply = tokio::time::timeout(
            self.timeout,
            vision.describe_image(image, &mime, &self.prompt),
        )
        .instrument(span)
        .await
        .map_err(|_| PipelineError::Upstream {
            source: VisionError::Timeout(self.timeout),
        })?;

        match reply {
            Ok(text) => {
                tracing::info!(
                    model = vision.model_name(),
                    elapsed_ms = %start.elapsed().as_millis(),
                    reply_len = text.len(),
                    "Vision reply received"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    model = vision.model_name(),
                    elapsed_ms = %start.elapsed().as_millis(),
                    error = %e,
                    "Vision call failed"
                );
                Err(e.into())
            }
        }
    }
}

/// Lower-case, drop parameters, fold the `image/jpg` alias.
pub fn normalize_mime_type(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    }
}

/// MIME type implied by the image's magic bytes, if recognised.
fn sniff_mime_type(image: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(image).ok()?;
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
