//! Media service for uploaded post images.

use std::sync::Arc;

use kotoba_common::{generate_storage_key, AppError, AppResult, StorageBackend};

/// Upload prefix for post images inside the media root.
const UPLOAD_PREFIX: &str = "posts";

/// Message attached to the `image` field when an upload is rejected.
const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
    /// GIF format
    Gif,
    /// WebP format
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    /// Get file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    /// Map a sniffed format onto the supported set.
    #[must_use]
    pub fn from_image(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

/// Media service for validating and storing uploaded images.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Validate an uploaded image and store it, returning its storage key.
    ///
    /// The bytes must both carry a supported magic number and fully decode;
    /// anything else is rejected before any database row references it.
    pub async fn store_image(&self, data: &[u8]) -> AppResult<String> {
        let Some(format) = detect_image_format(data) else {
            return Err(AppError::field("image", INVALID_IMAGE_MESSAGE));
        };

        image::load_from_memory(data)
            .map_err(|_| AppError::field("image", INVALID_IMAGE_MESSAGE))?;

        // Key carries the sniffed extension, not the client-supplied name
        let key = generate_storage_key(UPLOAD_PREFIX, &format!("image.{}", format.extension()));
        let uploaded = self.storage.upload(&key, data, format.mime_type()).await?;

        tracing::debug!(key = %uploaded.key, size = uploaded.size, "Stored post image");

        Ok(uploaded.key)
    }

    /// Public URL for a stored image key.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }
}

/// Detect the image format from magic bytes.
#[must_use]
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok().and_then(ImageFormat::from_image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kotoba_common::LocalStorage;

    fn png_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        let img = image::RgbaImage::new(1, 1);
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn create_test_service() -> MediaService {
        let root = std::env::temp_dir().join("kotoba-media-test");
        MediaService::new(Arc::new(LocalStorage::new(root, "/media/".to_string())))
    }

    #[test]
    fn test_detect_image_format_png() {
        assert_eq!(detect_image_format(&png_bytes()), Some(ImageFormat::Png));
    }

    #[test]
    fn test_detect_image_format_jpeg_magic() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_image_format(&data), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_detect_image_format_gif_magic() {
        assert_eq!(detect_image_format(b"GIF89a\x01\x00"), Some(ImageFormat::Gif));
    }

    #[test]
    fn test_detect_image_format_rejects_text() {
        assert_eq!(detect_image_format(b"hello world"), None);
    }

    #[tokio::test]
    async fn test_store_image_accepts_real_png() {
        let service = create_test_service();

        let key = service.store_image(&png_bytes()).await.unwrap();

        assert!(key.starts_with("posts/"));
        assert!(key.ends_with(".png"));
        assert_eq!(service.url(&key), format!("/media/{key}"));
    }

    #[tokio::test]
    async fn test_store_image_rejects_garbage() {
        let service = create_test_service();

        let result = service.store_image(b"definitely not an image").await;

        match result {
            Err(AppError::Validation(errors)) => {
                let fields = kotoba_common::error::field_messages(&errors);
                assert!(
                    fields["image"][0]
                        .as_str()
                        .unwrap()
                        .starts_with("Upload a valid image.")
                );
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_store_image_rejects_truncated_png() {
        let service = create_test_service();

        // Valid magic, no image data behind it
        let mut data = png_bytes();
        data.truncate(12);

        let result = service.store_image(&data).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
