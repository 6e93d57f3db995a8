//! HTTP handlers for the image service.

pub mod errors;
pub mod health;
pub mod images;

pub use errors::{handle_panic, not_found};
pub use health::{health_check, metrics};
pub use images::{generate_image, index};
