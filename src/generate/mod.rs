//! Content generation: text from a prompt, prompt improvement, images.
//!
//! Results feed the same insertion path as dictated text.

pub mod image;
pub mod text;

pub use image::{image_from_response, ImageGeneration, ImageGenerator, ImageRequest};
pub use text::{ContentGenerator, TextGeneration};
