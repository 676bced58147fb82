use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{FileError, ImageError, WallpaperResult};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];
const TIFF_LE_SIGNATURE: [u8; 4] = [b'I', b'I', 0x2A, 0x00];
const TIFF_BE_SIGNATURE: [u8; 4] = [b'M', b'M', 0x00, 0x2A];

/// `ftyp` major brands accepted as HEIF/HEIC.
pub const HEIF_BRANDS: [&[u8; 4]; 10] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1", b"msf1",
];

/// Container formats accepted as wallpaper sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG/JFIF.
    Jpeg,
    /// TIFF, either byte order.
    Tiff,
    /// HEIF family (`ftyp` box with a HEIF brand).
    Heic,
}

impl SourceFormat {
    /// Every supported format.
    pub const ALL: [SourceFormat; 4] = [Self::Png, Self::Jpeg, Self::Tiff, Self::Heic];

    /// Lowercase name as used in manifests and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Tiff => "tiff",
            Self::Heic => "heic",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify `bytes` by their leading signature.
pub fn classify(bytes: &[u8]) -> Result<SourceFormat, ImageError> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        return Ok(SourceFormat::Png);
    }
    if bytes.starts_with(&JPEG_SIGNATURE) {
        return Ok(SourceFormat::Jpeg);
    }
    if bytes.starts_with(&TIFF_LE_SIGNATURE) || bytes.starts_with(&TIFF_BE_SIGNATURE) {
        return Ok(SourceFormat::Tiff);
    }
    if bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && HEIF_BRANDS.iter().any(|brand| &bytes[8..12] == *brand)
    {
        return Ok(SourceFormat::Heic);
    }

    if bytes.is_empty() {
        return Err(ImageError::invalid_format("empty input"));
    }
    Err(ImageError::invalid_format("unrecognized image signature"))
}

/// Read the file at `path` and classify its contents.
pub fn classify_path(path: &Path) -> WallpaperResult<SourceFormat> {
    let bytes = std::fs::read(path).map_err(|e| FileError::content_not_obtained(path, e))?;
    Ok(classify(&bytes)?)
}

/// Whether `path` is readable and one of the `allowed` formats. Errors collapse to `false`.
pub fn validate(path: &Path, allowed: &[SourceFormat]) -> bool {
    classify_path(path)
        .map(|format| allowed.contains(&format))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/format/sniff.rs"]
mod tests;
