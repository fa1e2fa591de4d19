//! Signed uploads to a Cloudinary-compatible image host.
//!
//! Resizing happens on the host through an eager `transformation` parameter;
//! this adapter only signs and sends the request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ports::{ImageTransform, ImageUpload, MediaFolder, MediaStore, MediaStoreError};

/// Host endpoint and credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub api_base: Url,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
}

/// [`MediaStore`] uploading through the signed upload API.
pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct UploadResponseDto {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponseDto {
    result: String,
}

impl CloudinaryStore {
    /// Build the adapter with a client-level request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        config: CloudinaryConfig,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            clock,
        })
    }

    fn endpoint(&self, action: &str) -> Result<Url, MediaStoreError> {
        self.config
            .api_base
            .join(&format!("v1_1/{}/image/{action}", self.config.cloud_name))
            .map_err(|err| MediaStoreError::transport(err.to_string()))
    }

    /// Signed parameter list, ready to become form fields.
    fn signed_params(
        &self,
        mut params: Vec<(&'static str, String)>,
    ) -> Vec<(&'static str, String)> {
        params.push(("timestamp", self.clock.utc().timestamp().to_string()));
        let signature = sign_params(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_owned()));
        params
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, form: Form) -> Result<T, MediaStoreError> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| MediaStoreError::transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| MediaStoreError::transport(err.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref())
            .map_err(|err| MediaStoreError::decode(err.to_string()))
    }
}

/// Eager transformation string: fill crop, JPEG output, fixed quality.
fn transformation(transform: ImageTransform) -> String {
    format!(
        "c_fill,w_{},h_{},q_{},f_jpg",
        transform.width, transform.height, transform.quality
    )
}

/// SHA-256 over `k=v` pairs sorted by key, joined with `&`, plus the secret.
fn sign_params(params: &[(&'static str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MediaStoreError {
    let preview: String = String::from_utf8_lossy(body).chars().take(160).collect();
    if status.is_server_error() {
        MediaStoreError::transport(format!("status {}: {preview}", status.as_u16()))
    } else {
        MediaStoreError::rejected(status.as_u16(), preview)
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, upload: ImageUpload) -> Result<String, MediaStoreError> {
        let params = self.signed_params(vec![
            ("folder", upload.folder.as_str().to_owned()),
            ("public_id", upload.public_id.clone()),
            ("transformation", transformation(upload.transform)),
        ]);
        let file = Part::bytes(upload.bytes).file_name(format!("{}.jpg", upload.public_id));
        let form = params
            .into_iter()
            .fold(Form::new().part("file", file), |form, (key, value)| {
                form.text(key, value)
            });
        let decoded: UploadResponseDto = self.post(self.endpoint("upload")?, form).await?;
        Ok(decoded.secure_url)
    }

    async fn delete(&self, folder: MediaFolder, public_id: &str) -> Result<(), MediaStoreError> {
        let params = self.signed_params(vec![(
            "public_id",
            format!("{}/{public_id}", folder.as_str()),
        )]);
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value));
        let decoded: DestroyResponseDto = self.post(self.endpoint("destroy")?, form).await?;
        match decoded.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaStoreError::rejected(200_u16, other)),
        }
    }
}
