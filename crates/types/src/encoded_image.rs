//! JPEG-backed images exchanged with models as base64 data URIs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Quality used whenever an image is encoded for the wire.
pub const JPEG_QUALITY: u8 = 100;
const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// An image held as encoded JPEG bytes together with its dimensions.
///
/// Cloning is cheap; the encoded bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    jpeg: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl EncodedImage {
    /// Wrap already-encoded image bytes.
    ///
    /// JPEG input is kept as-is after a validating decode. Any other format the
    /// decoder understands is re-encoded as JPEG.
    pub fn from_encoded_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ImageError> {
        let bytes = bytes.into();
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        if format != ImageFormat::Jpeg {
            return Self::from_dynamic(&decoded);
        }
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            jpeg: bytes.into(),
        })
    }

    /// Encode an in-memory image as JPEG at [`JPEG_QUALITY`].
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, ImageError> {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))?;
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            jpeg: jpeg.into(),
        })
    }

    /// Load an image file from disk and encode it as JPEG.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let image = image::open(path)?;
        Self::from_dynamic(&image)
    }

    /// Decode a bare base64 payload.
    pub fn from_base64(payload: &str) -> Result<Self, ImageError> {
        let bytes = STANDARD.decode(payload.trim())?;
        Self::from_encoded_bytes(bytes)
    }

    /// Decode the payload after the last comma of a `data:` URI.
    ///
    /// Returns `Ok(None)` when the text has no comma or the payload is empty.
    ///
    /// ```rust
    /// use runway_types::EncodedImage;
    ///
    /// assert!(EncodedImage::from_data_uri("no comma here").unwrap().is_none());
    /// assert!(EncodedImage::from_data_uri("data:image/jpeg;base64,").unwrap().is_none());
    /// ```
    pub fn from_data_uri(text: &str) -> Result<Option<Self>, ImageError> {
        let Some((_, payload)) = text.rsplit_once(',') else {
            return Ok(None);
        };
        if payload.trim().is_empty() {
            return Ok(None);
        }
        Self::from_base64(payload).map(Some)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }

    /// `data:image/jpeg;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("{JPEG_DATA_URI_PREFIX}{}", self.to_base64())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_len", &self.jpeg.len())
            .finish()
    }
}

/// Errors raised while encoding or decoding images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image() -> EncodedImage {
        let pixels = RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 128]));
        EncodedImage::from_dynamic(&DynamicImage::ImageRgb8(pixels)).expect("encode sample")
    }

    #[test]
    fn from_dynamic_records_dimensions() {
        let image = sample_image();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert!(!image.as_bytes().is_empty());
    }

    #[test]
    fn data_uri_decodes_back_to_the_same_image() {
        let image = sample_image();
        let uri = image.data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let decoded = EncodedImage::from_data_uri(&uri)
            .expect("valid payload")
            .expect("payload present");
        assert_eq!(decoded, image);
    }

    #[test]
    fn bare_base64_after_a_plain_comma_is_accepted() {
        let image = sample_image();
        let decoded = EncodedImage::from_data_uri(&format!(",{}", image.to_base64()))
            .expect("valid payload")
            .expect("payload present");
        assert_eq!(decoded.width(), 8);
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let error = EncodedImage::from_data_uri("data:image/jpeg;base64,@@@").expect_err("not base64");
        assert!(matches!(error, ImageError::Base64(_)));
    }

    #[test]
    fn non_image_bytes_are_an_error() {
        let payload = STANDARD.encode(b"definitely not an image");
        assert!(EncodedImage::from_base64(&payload).is_err());
    }
}
