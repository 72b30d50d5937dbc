//! Recognition adapter: the boundary to the remote OCR service.
//!
//! The pipeline only sees the `Recognizer` trait; the concrete client, its
//! endpoint, credentials, and model name are configuration. Workers wrap
//! every call in a bounded timeout and route failures into the retry path.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::VisionOcrClient;

/// Errors that can occur during recognition.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The input reference could not be resolved to image bytes.
    #[error("Failed to read image '{input_ref}': {message}")]
    ImageRead { input_ref: String, message: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote service returned an error status.
    #[error("Recognition service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response carried no choices.
    #[error("Recognition service returned an empty response")]
    EmptyResponse,

    /// The call exceeded the caller-specified timeout.
    #[error("Recognition timed out after {0:?}")]
    Timeout(Duration),
}

/// Text recognized from one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedText {
    /// The recognized text.
    pub text: String,
    /// Model that produced it, when the service reports one.
    pub model: Option<String>,
}

/// Boundary to the remote recognition service.
///
/// Implementations resolve an opaque `input_ref` to image bytes and return
/// the recognized text. Calls are synchronous from the worker's viewpoint;
/// the worker applies its own timeout.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognizes the text in the referenced image.
    async fn recognize(&self, input_ref: &str) -> Result<RecognizedText, RecognizerError>;
}
