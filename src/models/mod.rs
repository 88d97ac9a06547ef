// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod image;
pub mod prediction;

pub use image::ImageObject;
pub use prediction::{Classification, confidence_for, zip_classifications};
