pub mod generator;
pub mod metrics;
pub mod providers;

pub use generator::{GeneratedImage, GenerationError, ImageGenerator, IMAGE_MIME_TYPE};
