use serde::{Deserialize, Serialize};

use crate::{
    bundle::frame::load_frame,
    container::{
        bmff::FourCc,
        heif::{HeifContainer, HeifWriter},
    },
    foundation::error::{ImageError, WallpaperError, WallpaperResult},
    metadata::{
        attributes::ImageAttributes,
        encode::{ImageMetadata, SerializedMetadata},
        xmp::XmpPacket,
    },
};

/// Default JPEG quality for re-encoded frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Knobs for bundle assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperOptions {
    /// JPEG quality (1..=100) used when a source has to be re-encoded.
    pub jpeg_quality: u8,
}

impl Default for WallpaperOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl WallpaperOptions {
    /// Reject out-of-range values.
    pub fn validate(&self) -> WallpaperResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WallpaperError::validation(format!(
                "jpeg quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Assembly progress: `step` of `total` units are done.
///
/// One unit per frame, plus a final unit once the container is serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Completed units, 1-based.
    pub step: usize,
    /// Total units for the request.
    pub total: usize,
}

impl Progress {
    /// Whether this is the final report.
    pub fn is_complete(&self) -> bool {
        self.step == self.total
    }

    /// Completed share in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.step as f64 / self.total as f64
    }
}

/// Build a bundle from `attributes`, which must already be in output order with the primary
/// frame first. `metadata` is attached to the primary frame only.
///
/// Nothing is returned unless every frame loaded.
#[tracing::instrument(skip_all, fields(frames = attributes.len(), key = metadata.key))]
pub fn assemble(
    attributes: &[ImageAttributes],
    metadata: &SerializedMetadata,
    options: &WallpaperOptions,
    mut progress: Option<&mut dyn FnMut(Progress)>,
) -> WallpaperResult<Vec<u8>> {
    if attributes.is_empty() {
        return Err(ImageError::DestinationNotCreated("no images to assemble".to_string()).into());
    }
    options.validate()?;

    let total = attributes.len() + 1;
    let mut writer = HeifWriter::new();
    for (i, attr) in attributes.iter().enumerate() {
        let frame = load_frame(&attr.path, options.jpeg_quality)?;
        tracing::debug!(
            index = attr.index,
            width = frame.width,
            height = frame.height,
            bytes = frame.data.len(),
            "frame added"
        );
        writer.add_image(frame);
        if let Some(cb) = progress.as_deref_mut() {
            cb(Progress { step: i + 1, total });
        }
    }

    writer.set_primary_xmp(metadata.to_xmp()?);
    let bytes = writer.finish()?;
    tracing::info!(bytes = bytes.len(), "bundle assembled");

    if let Some(cb) = progress.as_deref_mut() {
        cb(Progress { step: total, total });
    }
    Ok(bytes)
}

/// One image representation found in a bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// HEIF item id.
    pub item_id: u32,
    /// Coding of the item.
    pub codec: FourCc,
    /// `(width, height)` from the `ispe` property.
    pub dimensions: Option<(u32, u32)>,
    /// Whether this is the primary item.
    pub primary: bool,
    /// Whether an XMP packet describes this item.
    pub has_metadata: bool,
    /// Size of the coded bitstream.
    pub data_len: usize,
}

/// Summary of an existing bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleInfo {
    /// Major brand of the file.
    pub brand: FourCc,
    /// Id of the primary item.
    pub primary_item_id: u32,
    /// Visible image items in file order.
    pub frames: Vec<FrameInfo>,
    /// Wallpaper metadata attached to the primary item.
    pub metadata: Option<ImageMetadata>,
}

/// Read a bundle back.
pub fn inspect(bytes: &[u8]) -> WallpaperResult<BundleInfo> {
    let container = HeifContainer::parse(bytes)?;
    let primary = container.primary_item_id();

    let mut frames = Vec::new();
    for item in container.image_items() {
        let data_len = container.item_data(item.id)?.len();
        frames.push(FrameInfo {
            item_id: item.id,
            codec: item.kind,
            dimensions: container.dimensions(item.id),
            primary: item.id == primary,
            has_metadata: container.xmp_for(item.id)?.is_some(),
            data_len,
        });
    }

    let metadata = match container.xmp_for(primary)? {
        Some(xmp) => ImageMetadata::from_xmp(&XmpPacket::parse(&xmp)?)?,
        None => None,
    };

    Ok(BundleInfo {
        brand: container.major_brand(),
        primary_item_id: primary,
        frames,
        metadata,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/bundle/assemble.rs"]
mod tests;
