use std::path::Path;

use anyhow::Context as _;

use crate::{
    bundle::assemble::{Progress, WallpaperOptions, assemble},
    foundation::error::{ImageError, WallpaperError, WallpaperResult},
    metadata::{attributes::ImageAttributes, encode::encode},
};

/// Order `attributes` by index, move the primary frame to the front and renumber from 0.
///
/// Relative order of the remaining frames is preserved. Exactly one frame must be primary.
pub fn reorder_primary_first(
    mut attributes: Vec<ImageAttributes>,
) -> WallpaperResult<Vec<ImageAttributes>> {
    let primaries = attributes.iter().filter(|a| a.primary).count();
    if primaries != 1 {
        return Err(WallpaperError::validation(format!(
            "exactly one image must be primary, found {primaries}"
        )));
    }

    attributes.sort_by_key(|a| a.index);
    if let Some(pos) = attributes.iter().position(|a| a.primary) {
        let primary = attributes.remove(pos);
        attributes.insert(0, primary);
    }
    for (i, attr) in attributes.iter_mut().enumerate() {
        attr.index = i;
    }
    Ok(attributes)
}

/// Reorder, encode the metadata and assemble the bundle.
///
/// Pipeline:
/// 1. [`reorder_primary_first`]
/// 2. [`encode`](crate::encode)
/// 3. [`assemble`](crate::assemble)
///
/// The first failing stage aborts the request.
#[tracing::instrument(skip_all, fields(frames = attributes.len(), quality = options.jpeg_quality))]
pub fn create_wallpaper(
    attributes: Vec<ImageAttributes>,
    options: &WallpaperOptions,
    progress: Option<&mut dyn FnMut(Progress)>,
) -> WallpaperResult<Vec<u8>> {
    if attributes.is_empty() {
        return Err(ImageError::DestinationNotCreated("no images supplied".to_string()).into());
    }
    let ordered = reorder_primary_first(attributes)?;
    let metadata = encode(&ordered)?;
    tracing::debug!(key = metadata.key, encoded_len = metadata.value.len(), "metadata encoded");
    assemble(&ordered, &metadata, options, progress)
}

/// [`create_wallpaper`], then write the bundle to `out_path`.
///
/// An existing file is only replaced when `overwrite` is set; the check happens before any
/// frame is loaded.
pub fn write_wallpaper(
    attributes: Vec<ImageAttributes>,
    options: &WallpaperOptions,
    out_path: &Path,
    overwrite: bool,
    progress: Option<&mut dyn FnMut(Progress)>,
) -> WallpaperResult<()> {
    if !overwrite && out_path.exists() {
        return Err(WallpaperError::validation(format!(
            "output file '{}' already exists",
            out_path.display()
        )));
    }
    let bytes = create_wallpaper(attributes, options, progress)?;
    ensure_parent_dir(out_path)?;
    std::fs::write(out_path, &bytes)
        .with_context(|| format!("failed to write '{}'", out_path.display()))?;
    tracing::info!(path = %out_path.display(), bytes = bytes.len(), "wallpaper written");
    Ok(())
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> WallpaperResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/create.rs"]
mod tests;
