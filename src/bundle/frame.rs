//! Source image loading: every frame ends up as a JPEG bitstream with known dimensions.

use std::path::Path;

use image::{ImageFormat, codecs::jpeg::JpegEncoder};

use crate::{
    container::{
        bmff::FourCc,
        heif::{CodedImage, HeifContainer},
    },
    foundation::error::{FileError, ImageError, WallpaperResult},
    format::sniff::{SourceFormat, classify},
};

/// Read `path` and turn it into a frame ready for the container.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn load_frame(path: &Path, jpeg_quality: u8) -> WallpaperResult<CodedImage> {
    let bytes = std::fs::read(path).map_err(|e| FileError::content_not_obtained(path, e))?;
    Ok(frame_from_bytes(&bytes, jpeg_quality)?)
}

/// Classify `bytes` and produce a JPEG frame, re-encoding only when the source is not JPEG.
pub fn frame_from_bytes(bytes: &[u8], jpeg_quality: u8) -> Result<CodedImage, ImageError> {
    let format = classify(bytes)?;
    tracing::debug!(%format, len = bytes.len(), "loading frame");
    match format {
        SourceFormat::Jpeg => {
            let (width, height) = checked_jpeg(bytes)?;
            Ok(CodedImage::jpeg(bytes.to_vec(), width, height))
        }
        SourceFormat::Png => reencode(bytes, ImageFormat::Png, jpeg_quality),
        SourceFormat::Tiff => reencode(bytes, ImageFormat::Tiff, jpeg_quality),
        SourceFormat::Heic => heif_primary(bytes),
    }
}

/// Decode the whole bitstream so a truncated or corrupt body fails here, not in the bundle.
fn checked_jpeg(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    jpeg_reaches_eoi(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| ImageError::invalid_format(format!("jpeg: {e}")))?;
    Ok((decoded.width(), decoded.height()))
}

/// Walk the marker segments up to EOI; the decoder alone pads a cut-off scan.
fn jpeg_reaches_eoi(bytes: &[u8]) -> Result<(), ImageError> {
    let truncated = || ImageError::invalid_format("jpeg: stream ends before EOI");
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err(ImageError::invalid_format("jpeg: missing SOI marker"));
    }
    let mut pos = 2;
    loop {
        let (&lead, &marker) = bytes
            .get(pos)
            .zip(bytes.get(pos + 1))
            .ok_or_else(truncated)?;
        if lead != 0xFF {
            return Err(ImageError::invalid_format(format!(
                "jpeg: expected a marker at offset {pos}"
            )));
        }
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0xD9 => return Ok(()),
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            0x00 => {
                return Err(ImageError::invalid_format(format!(
                    "jpeg: invalid marker at offset {pos}"
                )));
            }
            _ => {}
        }

        let len = bytes
            .get(pos + 2..pos + 4)
            .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
            .ok_or_else(truncated)?;
        if len < 2 {
            return Err(ImageError::invalid_format(format!(
                "jpeg: segment at offset {pos} has length {len}"
            )));
        }
        pos += 2 + len;
        if pos > bytes.len() {
            return Err(truncated());
        }

        if marker == 0xDA {
            // Entropy-coded data runs until the next marker that is not a stuffed byte or RSTn.
            loop {
                match (bytes.get(pos), bytes.get(pos + 1)) {
                    (Some(0xFF), Some(0x00 | 0xD0..=0xD7)) => pos += 2,
                    (Some(0xFF), Some(_)) => break,
                    (Some(_), Some(_)) => pos += 1,
                    _ => return Err(truncated()),
                }
            }
        }
    }
}

fn reencode(bytes: &[u8], format: ImageFormat, quality: u8) -> Result<CodedImage, ImageError> {
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::invalid_format(format!("{format:?}: {e}")))?;
    let rgb = decoded.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| ImageError::ImageNotConverted(format!("jpeg encode: {e}")))?;
    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        jpeg_len = out.len(),
        "re-encoded frame"
    );
    Ok(CodedImage::jpeg(out, rgb.width(), rgb.height()))
}

/// Primary item of a HEIF source, which must already be JPEG coded.
fn heif_primary(bytes: &[u8]) -> Result<CodedImage, ImageError> {
    let container = HeifContainer::parse(bytes)?;
    let id = container.primary_item_id();
    let item = container
        .item(id)
        .ok_or_else(|| ImageError::invalid_format(format!("primary item {id} is missing")))?;
    if item.kind != FourCc::JPEG {
        return Err(ImageError::invalid_format(format!(
            "heif primary item is '{}' coded; only 'jpeg' items can be embedded",
            item.kind
        )));
    }

    let data = container.item_data(id)?;
    let decoded = checked_jpeg(&data)?;
    let (width, height) = container.dimensions(id).unwrap_or(decoded);
    Ok(CodedImage::jpeg(data, width, height))
}

#[cfg(test)]
#[path = "../../tests/unit/bundle/frame.rs"]
mod tests;
