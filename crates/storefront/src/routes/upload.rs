//! Product image upload.
//!
//! Images are written to the configured upload directory and served back
//! under `/uploads`.

use std::path::Path;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Multipart field carrying the file.
pub const IMAGE_FIELD: &str = "image";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Errors from image upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image uploaded")]
    MissingFile,

    #[error("Images only (jpeg, jpg, png, webp)")]
    UnsupportedType,

    #[error("Image is too large")]
    TooLarge,

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Multipart(err.body_text())
        }
    }
}

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    /// Public path of the stored image.
    pub image: String,
}

/// Lowercased extension of `file_name` if it is an accepted image type.
fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Check both the file name and the declared content type.
fn accepted_extension(
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> std::result::Result<String, UploadError> {
    let ext = file_name
        .and_then(image_extension)
        .ok_or(UploadError::UnsupportedType)?;
    let content_type = content_type
        .map(str::to_ascii_lowercase)
        .ok_or(UploadError::UnsupportedType)?;
    if ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        Ok(ext)
    } else {
        Err(UploadError::UnsupportedType)
    }
}

/// `POST /api/upload` (admin) - store one image from the `image` field.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let ext = accepted_extension(field.file_name(), field.content_type())?;
        let bytes = field.bytes().await.map_err(UploadError::from)?;
        if bytes.is_empty() {
            return Err(UploadError::MissingFile.into());
        }
        if bytes.len() > state.config().max_upload_bytes {
            return Err(UploadError::TooLarge.into());
        }

        let file_name = format!("image-{}.{ext}", Utc::now().timestamp_millis());
        let dir = &state.config().upload_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(UploadError::from)?;
        tokio::fs::write(dir.join(&file_name), &bytes)
            .await
            .map_err(UploadError::from)?;

        tracing::info!(file = %file_name, size = bytes.len(), "Image uploaded");
        return Ok(Json(UploadResponse {
            message: "Image uploaded successfully",
            image: format!("/uploads/{file_name}"),
        }));
    }

    Err(UploadError::MissingFile.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("a.b.webp").as_deref(), Some("webp"));
        assert_eq!(image_extension("script.svg"), None);
        assert_eq!(image_extension("noext"), None);
    }

    #[test]
    fn test_accepted_extension_requires_matching_content_type() {
        assert_eq!(
            accepted_extension(Some("cat.png"), Some("image/png")).unwrap(),
            "png"
        );
        assert!(matches!(
            accepted_extension(Some("cat.png"), Some("text/html")),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            accepted_extension(Some("cat.png"), None),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            accepted_extension(None, Some("image/png")),
            Err(UploadError::UnsupportedType)
        ));
    }
}
