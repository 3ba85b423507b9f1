//! Image encoding in both directions of the pipeline.
//!
//! * [`inline_image`] — the uploaded note → base64 [`InlineImage`] for the
//!   vision request. The bytes are sent untouched; only the MIME label is
//!   sniffed from the content.
//! * [`normalize_jpeg`] — a downloaded generated image → fixed-size RGB JPEG
//!   for upload. The canvas is filled exactly (aspect ratio is not kept), so
//!   every slide has identical dimensions.

use crate::backend::InlineImage;
use crate::config::ImageSize;
use crate::error::AssetError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// MIME type of an image, sniffed from its magic bytes.
///
/// Unknown formats are labelled `image/jpeg`.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/jpeg",
    }
}

/// Base64-wrap the note image for the vision request.
pub fn inline_image(bytes: &[u8]) -> InlineImage {
    let mime = sniff_mime(bytes);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());
    InlineImage::new(mime, b64)
}

/// Decode `bytes`, resize to exactly `size`, drop alpha and encode as JPEG.
pub fn normalize_jpeg(bytes: &[u8], size: ImageSize, quality: u8) -> Result<Vec<u8>, AssetError> {
    let img = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
        detail: e.to_string(),
    })?;

    let resized = img.resize_exact(size.width, size.height, FilterType::CatmullRom);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| AssetError::Encode {
            detail: e.to_string(),
        })?;
    debug!("Normalised image to {} JPEG ({} bytes)", size, buf.len());
    Ok(buf)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    /// A small RGBA PNG, like the generator returns.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([30, 144, 255, 200]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }
}
