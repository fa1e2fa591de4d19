//! Hosted image store adapter (Cloudinary-compatible upload API).

mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
