//! OpenAI-compatible vision-model OCR client.
//!
//! Sends the image as a base64 `data:` URL next to a fixed read-the-text
//! instruction and returns the first choice's message content. Works against
//! any chat-completions endpoint that accepts image-url content parts
//! (DashScope compatible mode, OpenRouter, a local gateway).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{RecognizedText, Recognizer, RecognizerError};

/// Instruction sent with every image.
const RECOGNIZE_PROMPT: &str = "Read all the text in the image.";

/// Image formats forwarded as-is; anything else is labelled jpeg.
const KNOWN_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Client for an OpenAI-compatible vision OCR endpoint.
pub struct VisionOcrClient {
    /// Base URL for the API (e.g., ".../compatible-mode/v1").
    api_base: String,
    /// API key sent as a bearer token.
    api_key: String,
    /// Model name to request.
    model_name: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl VisionOcrClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL of the chat-completions API
    /// * `api_key` - Bearer token for authentication
    /// * `model_name` - Vision model to request
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<Self, RecognizerError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RecognizerError::ClientBuild(e.to_string()))?;

        Ok(Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            http_client,
        })
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Builds the `data:` URL for an image file.
    async fn encode_image(&self, input_ref: &str) -> Result<String, RecognizerError> {
        let bytes = tokio::fs::read(input_ref)
            .await
            .map_err(|e| RecognizerError::ImageRead {
                input_ref: input_ref.to_string(),
                message: e.to_string(),
            })?;

        let format = image_format(input_ref);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        Ok(format!("data:image/{};base64,{}", format, encoded))
    }
}

/// Returns the image format label for a path, defaulting to jpeg.
fn image_format(input_ref: &str) -> &'static str {
    let ext = Path::new(input_ref)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some(ext) if KNOWN_FORMATS.contains(&ext) => match ext {
            "png" => "png",
            "webp" => "webp",
            _ => "jpeg",
        },
        _ => "jpeg",
    }
}

#[async_trait]
impl Recognizer for VisionOcrClient {
    async fn recognize(&self, input_ref: &str) -> Result<RecognizedText, RecognizerError> {
        let image_url = self.encode_image(input_ref).await?;

        let request = ApiRequest {
            model: self.model_name.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                    ContentPart::Text {
                        text: RECOGNIZE_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognizerError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            return Err(RecognizerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| RecognizerError::Http(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(RecognizerError::EmptyResponse)?;

        Ok(RecognizedText {
            text,
            model: Some(parsed.model),
        })
    }
}

/// Internal request structure for the chat-completions API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
}

/// Internal message structure: vision requests use content parts.
#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Vec<ContentPart>,
}

/// A single content part of a vision message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

/// Image reference within a content part.
#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Internal response structure from the API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
}

/// Internal choice structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

/// Internal message structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_mapping() {
        assert_eq!(image_format("uploads/a.png"), "png");
        assert_eq!(image_format("uploads/a.PNG"), "png");
        assert_eq!(image_format("uploads/a.webp"), "webp");
        assert_eq!(image_format("uploads/a.jpg"), "jpeg");
        assert_eq!(image_format("uploads/a.jpeg"), "jpeg");
        assert_eq!(image_format("uploads/a.tiff"), "jpeg");
        assert_eq!(image_format("uploads/noext"), "jpeg");
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ApiRequest {
            model: "qwen-vl-ocr".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                    ContentPart::Text {
                        text: RECOGNIZE_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let value = serde_json::to_value(&request).expect("serialize");
        let parts = value["messages"][0]["content"]
            .as_array()
            .expect("content parts");

        assert_eq!(parts[0]["type"], "image_url");
        assert!(parts[0]["image_url"]["url"]
            .as_str()
            .expect("url")
            .starts_with("data:image/png;base64,"));
        assert_eq!(parts[1]["type"], "text");
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"message": "invalid api key"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(parsed.error.message, "invalid api key");
    }

    #[test]
    fn test_client_accessors() {
        let client = VisionOcrClient::new("https://api.example/v1", "key", "qwen-vl-ocr")
            .expect("client should build");

        assert_eq!(client.api_base(), "https://api.example/v1");
        assert_eq!(client.model_name(), "qwen-vl-ocr");
    }
}
