//! Image preparation for transport.
//!
//! Every provider receives the image as base64-encoded PNG. Inputs in other
//! formats are decoded and re-encoded; oversized images are downscaled.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::CompletionError;

const PNG_MEDIA_TYPE: &str = "image/png";

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64-encoded PNG bytes
    pub data: String,
    /// MIME type, always `image/png`
    pub media_type: String,
}

impl ImageInput {
    /// Prepare raw image bytes of any supported format.
    ///
    /// PNG input within `max_dimension` is passed through untouched. Anything
    /// else is decoded, shrunk so its longest edge fits `max_dimension`, and
    /// re-encoded as PNG.
    pub fn from_bytes(bytes: &[u8], max_dimension: u32) -> Result<Self, CompletionError> {
        if bytes.is_empty() {
            return Err(CompletionError::InvalidConfiguration(
                "image is empty".to_string(),
            ));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| CompletionError::Image(format!("Unrecognized image format: {e}")))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| CompletionError::Image(format!("Failed to decode image: {e}")))?;

        let (width, height) = decoded.dimensions();
        let oversized = width > max_dimension || height > max_dimension;

        if format == ImageFormat::Png && !oversized {
            return Ok(Self::from_base64_png(BASE64.encode(bytes)));
        }

        let prepared = if oversized {
            tracing::debug!(
                width,
                height,
                max_dimension,
                "Downscaling image before upload"
            );
            decoded.thumbnail(max_dimension, max_dimension)
        } else {
            decoded
        };

        let mut buffer = Cursor::new(Vec::new());
        prepared
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CompletionError::Image(format!("Failed to encode PNG: {e}")))?;

        Ok(Self::from_base64_png(BASE64.encode(buffer.into_inner())))
    }

    /// Wrap data that is already base64-encoded PNG.
    pub fn from_base64_png(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: PNG_MEDIA_TYPE.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    fn decode_output(input: &ImageInput) -> DynamicImage {
        let bytes = BASE64.decode(&input.data).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_png_passes_through() {
        let bytes = encode(&DynamicImage::new_rgb8(10, 10), ImageFormat::Png);
        let input = ImageInput::from_bytes(&bytes, 2048).unwrap();
        assert_eq!(input.data, BASE64.encode(&bytes));
        assert_eq!(input.media_type, "image/png");
    }

    #[test]
    fn test_jpeg_is_reencoded_as_png() {
        let bytes = encode(&DynamicImage::new_rgb8(20, 10), ImageFormat::Jpeg);
        let input = ImageInput::from_bytes(&bytes, 2048).unwrap();
        let img = decode_output(&input);
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[test]
    fn test_oversized_image_is_downscaled() {
        let bytes = encode(&DynamicImage::new_rgb8(400, 200), ImageFormat::Png);
        let input = ImageInput::from_bytes(&bytes, 100).unwrap();
        let img = decode_output(&input);
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = ImageInput::from_bytes(&[], 2048).unwrap_err();
        assert!(matches!(err, CompletionError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = ImageInput::from_bytes(b"definitely not an image", 2048).unwrap_err();
        assert!(matches!(err, CompletionError::Image(_)));
    }

    #[test]
    fn test_data_url() {
        let input = ImageInput::from_base64_png("AAAA");
        assert_eq!(input.data_url(), "data:image/png;base64,AAAA");
    }
}
