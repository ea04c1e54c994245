//! Extraction pipeline: image → vision model → tolerant parse → validated
//! records → session store.

pub mod client;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod types;
pub mod validation;

pub use client::*;
pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;
pub use validation::*;

use thiserror::Error;

use crate::vision::VisionError;

/// Precondition failures on the submitted image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unsupported image type '{0}'")]
    UnsupportedMimeType(String),

    #[error("Image is empty")]
    EmptyImage,

    #[error("Image too large ({size} bytes, maximum is {max})")]
    TooLarge { size: usize, max: usize },

    #[error("File content is not a recognised image")]
    NotAnImage,

    #[error("Declared type '{declared}' does not match the file content ({detected})")]
    ContentMismatch { declared: String, detected: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Vision call failed: {source}")]
    Upstream {
        #[source]
        source: VisionError,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl PipelineError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            PipelineError::Upstream { .. } => "UPSTREAM_ERROR",
            PipelineError::MalformedResponse(_) => "MALFORMED_RESPONSE",
        }
    }
}

impl From<VisionError> for PipelineError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::NotReachable(url) => {
                PipelineError::ServiceUnavailable(format!("vision service not reachable at {url}"))
            }
            other => PipelineError::Upstream { source: other },
        }
    }
}
