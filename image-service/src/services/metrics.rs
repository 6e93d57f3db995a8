//! Prometheus metrics for image-service.
//!
//! Provides request and provider metrics for observability.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static IMAGE_GENERATION_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static IMAGE_GENERATION_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static IMAGE_GENERATION_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENAI_PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new(
            "image_generation_requests_total",
            "Total image generation requests by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create image_generation_requests_total metric");

    // Includes retry backoff
    let duration = HistogramVec::new(
        HistogramOpts::new(
            "image_generation_duration_seconds",
            "End-to-end image generation duration in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["outcome"],
    )
    .expect("Failed to create image_generation_duration_seconds metric");

    let attempts_total = IntCounterVec::new(
        Opts::new(
            "image_generation_attempts_total",
            "Total calls made to the image provider by result",
        ),
        &["result"],
    )
    .expect("Failed to create image_generation_attempts_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["model"],
    )
    .expect("Failed to create genai_provider_latency_seconds metric");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("Failed to register image_generation_requests_total");
    registry
        .register(Box::new(duration.clone()))
        .expect("Failed to register image_generation_duration_seconds");
    registry
        .register(Box::new(attempts_total.clone()))
        .expect("Failed to register image_generation_attempts_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register genai_provider_latency_seconds");

    let _ = REGISTRY.set(registry);
    let _ = IMAGE_GENERATION_REQUESTS_TOTAL.set(requests_total);
    let _ = IMAGE_GENERATION_DURATION_SECONDS.set(duration);
    let _ = IMAGE_GENERATION_ATTEMPTS_TOTAL.set(attempts_total);
    let _ = GENAI_PROVIDER_LATENCY_SECONDS.set(provider_latency);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record a finished generation request.
pub fn record_generation(outcome: &str, duration_secs: f64) {
    if let Some(counter) = IMAGE_GENERATION_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
    if let Some(histogram) = IMAGE_GENERATION_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }
}

/// Record one provider call.
pub fn record_attempt(result: &str) {
    if let Some(counter) = IMAGE_GENERATION_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[result]).inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(model: &str, duration_secs: f64) {
    if let Some(histogram) = GENAI_PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[model])
            .observe(duration_secs);
    }
}
