//! Image generation provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for image providers,
//! allowing easy swapping between backends (Gemini, mock).

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use bytes::Bytes;
use service_core::retry::Retryable;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    /// Upstream answered HTTP 429.
    #[error("429 Too Many Requests: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}

/// Decoded response of a single generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedContent {
    pub candidates: Vec<Candidate>,
}

/// One candidate output: an ordered sequence of parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub parts: Vec<ContentPart>,
}

/// A content part; may carry text, inline binary data, or neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

/// Raw binary payload with its declared MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Bytes,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

impl GeneratedContent {
    /// Content with a single candidate made of `parts`.
    pub fn from_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            candidates: vec![Candidate { parts }],
        }
    }

    /// First inline data part of the first candidate, if any. A response with
    /// no candidates yields `None` and is reported as "No image generated".
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }
}

/// Trait for text-to-image providers (e.g., Gemini).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Run one generation call for `prompt`. No retries happen here.
    async fn generate(&self, prompt: &str) -> Result<GeneratedContent, ProviderError>;

    /// Model identifier, for logs and metrics.
    fn model(&self) -> &str;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
