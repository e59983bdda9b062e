use image::codecs::jpeg::JpegEncoder;

use crate::foundation::error::{Svg2ImgError, Svg2ImgResult};

/// Re-encode PNG bytes as a baseline JPEG at `quality` (clamped to `1..=100`).
///
/// Alpha is dropped; callers that care paint an opaque background first.
pub fn transcode_png_to_jpeg(png: &[u8], quality: u8) -> Svg2ImgResult<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| Svg2ImgError::encode(format!("decode rendered png: {e}")))?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let quality = quality.clamp(1, 100);
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| Svg2ImgError::encode(format!("encode jpeg (quality {quality}): {e}")))?;

    tracing::debug!(quality, png_len = png.len(), jpeg_len = out.len(), "jpeg transcode");
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/jpeg.rs"]
mod tests;
