//! Local Ollama vision client (`/api/chat` with base64 images).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{VisionClient, VisionError};

/// Ollama HTTP client for a vision-capable local model.
pub struct OllamaVisionClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaVisionClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout,
        })
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: Vec<String>,
}

/// 0.0 for deterministic extraction.
#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl VisionClient for OllamaVisionClient {
    async fn describe_image(
        &self,
        image: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<String, VisionError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![base64::engine::general_purpose::STANDARD.encode(image)],
            }],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::from_reqwest(e, &self.base_url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::ResponseParsing(e.to_string()))?;

        if parsed.message.content.trim().is_empty() {
            return Err(VisionError::EmptyResponse);
        }
        Ok(parsed.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn fake_ollama(status: StatusCode, reply: serde_json::Value) -> SocketAddr {
        let app = Router::new().route(
            "/api/chat",
            post(move |Json(body): Json<serde_json::Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(body["stream"], false);
                    assert_eq!(body["messages"][0]["images"].as_array().map(Vec::len), Some(1));
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client =
            OllamaVisionClient::new("http://localhost:11434/", "llava", Duration::from_secs(60))
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model_name(), "llava");
    }

    #[tokio::test]
    async fn returns_message_content() {
        let addr = fake_ollama(
            StatusCode::OK,
            serde_json::json!({"message": {"role": "assistant", "content": "{\"medications\": []}"}}),
        )
        .await;
        let client =
            OllamaVisionClient::new(&format!("http://{addr}"), "llava", Duration::from_secs(5))
                .unwrap();
        let text = client
            .describe_image(b"\x89PNG", "image/png", "prompt")
            .await
            .unwrap();
        assert_eq!(text, "{\"medications\": []}");
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let addr = fake_ollama(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": "model not found"}),
        )
        .await;
        let client =
            OllamaVisionClient::new(&format!("http://{addr}"), "llava", Duration::from_secs(5))
                .unwrap();
        let err = client
            .describe_image(b"img", "image/png", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn blank_content_is_empty_response() {
        let addr = fake_ollama(
            StatusCode::OK,
            serde_json::json!({"message": {"role": "assistant", "content": "  "}}),
        )
        .await;
        let client =
            OllamaVisionClient::new(&format!("http://{addr}"), "llava", Duration::from_secs(5))
                .unwrap();
        let err = client
            .describe_image(b"img", "image/png", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::EmptyResponse));
    }
}
