//! Driven port for the hosted image store.
//!
//! Resizing and re-encoding happen on the host; the domain only names the
//! transformation to apply.

use async_trait::async_trait;

use super::define_port_error;

/// Logical folder on the media host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Tours,
    Users,
}

impl MediaFolder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tours => "tours",
            Self::Users => "users",
        }
    }
}

/// Fill-crop transformation applied by the host on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransform {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl ImageTransform {
    /// Square profile photos.
    pub const USER_PHOTO: Self = Self {
        width: 500,
        height: 500,
        quality: 90,
    };
    /// 3:2 tour imagery.
    pub const TOUR_IMAGE: Self = Self {
        width: 2000,
        height: 1333,
        quality: 90,
    };
}

/// Image bytes to store under `folder/public_id`, re-encoded as JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub folder: MediaFolder,
    pub public_id: String,
    pub bytes: Vec<u8>,
    pub transform: ImageTransform,
}

define_port_error! {
    /// Errors surfaced by media store adapters.
    pub enum MediaStoreError {
        /// Network transport failed before a response arrived.
        Transport { message: String } => "media host transport failed: {message}",
        /// The host answered with an error status.
        Rejected { status: u16, message: String } =>
            "media host rejected request ({status}): {message}",
        /// The host response could not be decoded.
        Decode { message: String } => "media host response decode failed: {message}",
    }
}

/// Port for uploading and removing hosted images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an image and return its public HTTPS URL.
    async fn upload(&self, upload: ImageUpload) -> Result<String, MediaStoreError>;

    /// Remove `folder/public_id` from the host.
    async fn delete(&self, folder: MediaFolder, public_id: &str) -> Result<(), MediaStoreError>;
}
