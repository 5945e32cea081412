//! Photo handling: normalization and upload to the object store.

pub mod normalize;
mod service;

pub use normalize::{NormalizedImage, INVALID_IMAGE};
pub use service::{ImageService, ImageUpload};
