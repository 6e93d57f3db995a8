//! Mock provider implementation for testing.

use super::{ContentPart, GeneratedContent, ImageProvider, ProviderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted result of a mock generation call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return a single part carrying these PNG bytes.
    Image(Vec<u8>),
    /// Return a response whose parts carry no inline data.
    TextOnly(String),
    /// Fail with a rate-limit error.
    RateLimited,
    /// Fail with a non-retryable API error.
    ApiError(String),
}

impl MockOutcome {
    fn into_result(self) -> Result<GeneratedContent, ProviderError> {
        match self {
            MockOutcome::Image(bytes) => Ok(GeneratedContent::from_parts(vec![
                ContentPart::text("Mock image"),
                ContentPart::inline("image/png", bytes),
            ])),
            MockOutcome::TextOnly(text) => {
                Ok(GeneratedContent::from_parts(vec![ContentPart::text(text)]))
            }
            MockOutcome::RateLimited => Err(ProviderError::RateLimited(
                "Resource has been exhausted (e.g. check quota).".to_string(),
            )),
            MockOutcome::ApiError(msg) => Err(ProviderError::ApiError(msg)),
        }
    }
}

/// Mock image provider for testing.
///
/// Plays back scripted outcomes in order; once the script runs out the
/// fallback outcome is repeated.
pub struct MockImageProvider {
    enabled: bool,
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockImageProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            script: Mutex::new(VecDeque::new()),
            fallback: MockOutcome::Image(Self::PNG_SIGNATURE.to_vec()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// PNG file signature, used as placeholder image bytes.
    pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Provider that plays `outcomes` in order, then repeats the last one.
    pub fn scripted(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        let script: VecDeque<MockOutcome> = outcomes.into_iter().collect();
        let mut provider = Self::new(true);
        if let Some(last) = script.back() {
            provider.fallback = last.clone();
        }
        provider.script = Mutex::new(script);
        provider
    }

    /// Provider that always returns the same outcome.
    pub fn always(outcome: MockOutcome) -> Self {
        Self::scripted([outcome])
    }

    /// Number of generation calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn next_outcome(&self) -> MockOutcome {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedContent, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ));
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        self.next_outcome().into_result()
    }

    fn model(&self) -> &str {
        "mock-image-model"
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ))
        }
    }
}
