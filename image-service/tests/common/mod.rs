#![allow(dead_code)]

use image_service::config::{
    GeminiSettings, ImageConfig, RetrySettings, DEFAULT_GEMINI_API_BASE, DEFAULT_IMAGE_MODEL,
};
use image_service::services::providers::ImageProvider;
use image_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

/// Test configuration: random port, fast backoff.
pub fn test_config() -> ImageConfig {
    ImageConfig {
        common: CoreConfig { port: 0 },
        gemini: GeminiSettings {
            api_key: "test-api-key".to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            request_timeout_secs: 5,
        },
        retry: RetrySettings {
            max_attempts: 3,
            base_delay_ms: 5,
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application around `provider` on a random port.
    pub async fn spawn(provider: Arc<dyn ImageProvider>) -> Self {
        Self::spawn_with_config(test_config(), provider).await
    }

    pub async fn spawn_with_config(config: ImageConfig, provider: Arc<dyn ImageProvider>) -> Self {
        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to send request")
    }
}
