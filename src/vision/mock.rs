//! Mock vision client for tests and local runs without a provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{VisionClient, VisionError};

enum MockReply {
    Text(String),
    NotReachable,
    ApiError { status: u16, message: String },
}

/// Returns a configurable reply and records what it was asked.
pub struct MockVisionClient {
    reply: MockReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self::with_reply(MockReply::Text(response.to_string()))
    }

    /// A client whose every call fails as if the host were down.
    pub fn unreachable() -> Self {
        Self::with_reply(MockReply::NotReachable)
    }

    /// A client whose every call fails with an HTTP error.
    pub fn failing(status: u16, message: &str) -> Self {
        Self::with_reply(MockReply::ApiError {
            status,
            message: message.to_string(),
        })
    }

    /// Sleep before answering, to exercise timeouts and concurrency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn describe_image(
        &self,
        _image: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::NotReachable => Err(VisionError::NotReachable("mock".into())),
            MockReply::ApiError { status, message } => Err(VisionError::ApiError {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
