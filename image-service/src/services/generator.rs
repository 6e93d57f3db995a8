//! Image generation with bounded retry on upstream rate limiting.

use crate::services::metrics;
use crate::services::providers::{ImageProvider, ProviderError};
use bytes::Bytes;
use service_core::error::AppError;
use service_core::retry::{RetryPolicy, retry_with_backoff};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// MIME type of every image returned to callers.
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// A generated image ready to be sent to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub mime_type: &'static str,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    /// The provider failed, or kept rate limiting until the attempt ceiling.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider answered without any inline data part. Not retried.
    #[error("No image generated")]
    NoImageGenerated,
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

/// Wraps an [`ImageProvider`] with the retry policy.
#[derive(Clone)]
pub struct ImageGenerator {
    provider: Arc<dyn ImageProvider>,
    policy: RetryPolicy,
}

impl ImageGenerator {
    pub fn new(provider: Arc<dyn ImageProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate an image for `description`.
    ///
    /// Rate-limit failures are retried with exponential backoff up to the
    /// policy's attempt ceiling. Any other failure, and a response without
    /// inline data, ends the request immediately.
    #[tracing::instrument(skip(self), fields(model = %self.provider.model()))]
    pub async fn generate(&self, description: &str) -> Result<GeneratedImage, GenerationError> {
        let started = Instant::now();
        let provider = &self.provider;

        let result = retry_with_backoff(&self.policy, "generate_image", move || async move {
            let call_started = Instant::now();
            let outcome = provider.generate(description).await;
            metrics::record_provider_latency(
                provider.model(),
                call_started.elapsed().as_secs_f64(),
            );
            match &outcome {
                Ok(_) => metrics::record_attempt("ok"),
                Err(e) => metrics::record_attempt(e.kind()),
            }
            outcome
        })
        .await;

        let outcome = match result {
            Ok(content) => match content.first_inline_data() {
                Some(inline) => Ok(GeneratedImage {
                    data: inline.data.clone(),
                    mime_type: IMAGE_MIME_TYPE,
                }),
                None => Err(GenerationError::NoImageGenerated),
            },
            Err(e) => Err(GenerationError::Provider(e)),
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(GenerationError::NoImageGenerated) => "no_image",
            Err(GenerationError::Provider(ProviderError::RateLimited(_))) => "rate_limited",
            Err(GenerationError::Provider(_)) => "error",
        };
        metrics::record_generation(label, started.elapsed().as_secs_f64());

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::{MockImageProvider, MockOutcome};
    use std::time::Duration;

    fn generator(provider: &Arc<MockImageProvider>) -> ImageGenerator {
        ImageGenerator::new(provider.clone(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn returns_first_inline_image_after_one_call() {
        let provider = Arc::new(MockImageProvider::always(MockOutcome::Image(vec![7, 8, 9])));

        let image = generator(&provider).generate("a cat").await.unwrap();

        assert_eq!(image.data.as_ref(), &[7, 8, 9]);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.prompts(), vec!["a cat"]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limits_with_exponential_backoff() {
        let provider = Arc::new(MockImageProvider::scripted([
            MockOutcome::RateLimited,
            MockOutcome::RateLimited,
            MockOutcome::Image(vec![1]),
        ]));
        let start = tokio::time::Instant::now();

        let image = generator(&provider).generate("a dog").await.unwrap();

        let elapsed = start.elapsed();
        assert_eq!(image.data.as_ref(), &[1]);
        assert_eq!(provider.calls(), 3);
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_millis(6100));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_rate_limited_attempts() {
        let provider = Arc::new(MockImageProvider::always(MockOutcome::RateLimited));

        let err = generator(&provider).generate("a bird").await.unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Provider(ProviderError::RateLimited(_))
        ));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn non_rate_limit_failure_is_not_retried() {
        let provider = Arc::new(MockImageProvider::always(MockOutcome::ApiError(
            "Gemini API error 400 Bad Request: invalid prompt".to_string(),
        )));

        let err = generator(&provider).generate("a fish").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "API error: Gemini API error 400 Bad Request: invalid prompt"
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn response_without_image_is_not_retried() {
        let provider = Arc::new(MockImageProvider::scripted([
            MockOutcome::TextOnly("I cannot draw that".to_string()),
            MockOutcome::Image(vec![1]),
        ]));

        let err = generator(&provider).generate("a horse").await.unwrap_err();

        assert!(matches!(err, GenerationError::NoImageGenerated));
        assert_eq!(err.to_string(), "No image generated");
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn generation_error_maps_to_upstream_app_error() {
        let app_error: AppError = GenerationError::NoImageGenerated.into();
        assert!(matches!(app_error, AppError::UpstreamError(msg) if msg == "No image generated"));
    }
}
