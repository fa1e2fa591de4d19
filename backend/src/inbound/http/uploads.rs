//! Multipart image intake for photo and tour image uploads.

use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;
use serde_json::json;

use crate::domain::Error;

/// Largest single image accepted, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const NOT_AN_IMAGE: &str = "Not an image! Please upload only images.";

/// A named multipart field and how many files it may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageField {
    pub name: &'static str,
    pub max_count: usize,
}

impl ImageField {
    pub(crate) const fn new(name: &'static str, max_count: usize) -> Self {
        Self { name, max_count }
    }
}

/// One uploaded image, tagged with the field it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadedImage {
    pub field: &'static str,
    pub bytes: Vec<u8>,
}

fn unexpected_field(name: &str) -> Error {
    Error::invalid_request(format!("Unexpected field: {name}"))
        .with_details(json!({ "field": name, "code": "unexpected_field" }))
}

fn multipart_error(err: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("Malformed multipart body: {err}"))
}

fn is_image(field: &Field) -> bool {
    field
        .content_type()
        .is_some_and(|mime| mime.type_().as_str() == "image")
}

async fn read_field(field: &mut Field) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(Error::invalid_request(format!(
                "Images may not exceed {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Drain `payload`, keeping files from the `accepted` fields in arrival order.
///
/// Non-image parts fail with the client-facing "Not an image!" message;
/// unknown fields or too many files in one field fail as unexpected.
pub(crate) async fn collect_images(
    mut payload: Multipart,
    accepted: &[ImageField],
) -> Result<Vec<UploadedImage>, Error> {
    let mut images: Vec<UploadedImage> = Vec::new();
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(multipart_error)?;
        let name = field.name().unwrap_or_default().to_owned();
        let spec = accepted
            .iter()
            .find(|candidate| candidate.name == name)
            .ok_or_else(|| unexpected_field(&name))?;
        let already = images.iter().filter(|image| image.field == spec.name).count();
        if already >= spec.max_count {
            return Err(unexpected_field(&name));
        }
        if !is_image(&field) {
            return Err(Error::invalid_request(NOT_AN_IMAGE));
        }
        let bytes = read_field(&mut field).await?;
        images.push(UploadedImage {
            field: spec.name,
            bytes,
        });
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::test_support::http::{MultipartPart, multipart_request};
    use actix_web::{FromRequest, test};
    use rstest::rstest;

    const PHOTO: ImageField = ImageField::new("photo", 1);

    async fn collect(
        parts: &[MultipartPart<'_>],
        accepted: &[ImageField],
    ) -> Result<Vec<UploadedImage>, Error> {
        let (req, mut payload) =
            multipart_request(test::TestRequest::post(), parts).to_http_parts();
        let multipart = Multipart::from_request(&req, &mut payload)
            .await
            .expect("multipart extractor");
        collect_images(multipart, accepted).await
    }

    #[rstest]
    #[actix_web::test]
    async fn images_are_collected_in_order() {
        let images = collect(
            &[
                MultipartPart::image("images", b"one"),
                MultipartPart::image("imageCover", b"cover"),
                MultipartPart::image("images", b"two"),
            ],
            &[ImageField::new("imageCover", 1), ImageField::new("images", 3)],
        )
        .await
        .expect("accepted");
        let fields: Vec<_> = images.iter().map(|image| image.field).collect();
        assert_eq!(fields, ["images", "imageCover", "images"]);
        assert_eq!(images[1].bytes, b"cover");
    }

    #[rstest]
    #[actix_web::test]
    async fn non_images_are_rejected() {
        let err = collect(&[MultipartPart::text("photo", "plain")], &[PHOTO])
            .await
            .expect_err("text part");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.message(), NOT_AN_IMAGE);
    }

    #[rstest]
    #[case(&[MultipartPart::image("avatar", b"x")])]
    #[case(&[MultipartPart::image("photo", b"x"), MultipartPart::image("photo", b"y")])]
    #[actix_web::test]
    async fn unknown_or_excess_fields_are_rejected(#[case] parts: &[MultipartPart<'static>]) {
        let err = collect(parts, &[PHOTO]).await.expect_err("unexpected");
        assert!(err.message().starts_with("Unexpected field"));
    }
}
