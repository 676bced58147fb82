use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    bundle::assemble::{DEFAULT_JPEG_QUALITY, WallpaperOptions},
    foundation::error::{FileError, WallpaperError, WallpaperResult},
    metadata::attributes::Appearance,
    solar::noaa::validate_coordinates,
};

/// Observer location used to compute sun positions for solar frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees, north positive.
    pub latitude: f64,
    /// Degrees, east positive.
    pub longitude: f64,
    /// Standard UTC offset in hours. Falls back to the image's EXIF offset when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_hours: Option<f64>,
    /// Daylight saving shift in hours.
    #[serde(default)]
    pub dst_offset_hours: f64,
}

/// How a manifest entry is keyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Sun position.
    Solar,
    /// Time of day.
    Time,
    /// Light/dark appearance.
    Appearance,
}

/// One source image in a manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestImage {
    /// Image path, relative to the manifest directory unless absolute.
    pub path: PathBuf,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Explicit sun altitude for solar entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Explicit sun azimuth for solar entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth: Option<f64>,
    /// Local capture time; falls back to EXIF `DateTimeOriginal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<NaiveDateTime>,
    /// Light/dark role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,
    /// Primary frame marker.
    #[serde(default)]
    pub primary: bool,
}

/// JSON description of one bundle request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallpaperManifest {
    /// Observer location for solar entries without explicit angles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// JPEG quality for re-encoded frames.
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
    /// Source images in bundle order.
    pub images: Vec<ManifestImage>,
}

fn default_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl WallpaperManifest {
    /// Parse a manifest from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> WallpaperResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| WallpaperError::serde(format!("parse manifest JSON: {e}")))
    }

    /// Parse a manifest from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> WallpaperResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| FileError::content_not_obtained(path, e))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Assembly options requested by the manifest.
    pub fn options(&self) -> WallpaperOptions {
        WallpaperOptions {
            jpeg_quality: self.jpeg_quality,
        }
    }

    /// Check field ranges and entry consistency. Does not touch the filesystem.
    pub fn validate(&self) -> WallpaperResult<()> {
        if self.images.is_empty() {
            return Err(WallpaperError::validation("manifest lists no images"));
        }
        self.options().validate()?;

        if let Some(loc) = &self.location {
            validate_coordinates(loc.latitude, loc.longitude)?;
            if let Some(tz) = loc.utc_offset_hours
                && !(-14.0..=14.0).contains(&tz)
            {
                return Err(WallpaperError::validation(format!(
                    "utc_offset_hours must be within -14..=14, got {tz}"
                )));
            }
            if !(-2.0..=2.0).contains(&loc.dst_offset_hours) {
                return Err(WallpaperError::validation(format!(
                    "dst_offset_hours must be within -2..=2, got {}",
                    loc.dst_offset_hours
                )));
            }
        }

        let primaries = self.images.iter().filter(|i| i.primary).count();
        if primaries != 1 {
            return Err(WallpaperError::validation(format!(
                "exactly one image must be primary, found {primaries}"
            )));
        }

        for (i, image) in self.images.iter().enumerate() {
            if image.path.as_os_str().is_empty() {
                return Err(WallpaperError::validation(format!(
                    "image {i} has an empty path"
                )));
            }
            if image.kind != self.images[0].kind {
                return Err(WallpaperError::validation(format!(
                    "image {i} is '{:?}' but the bundle is '{:?}'",
                    image.kind, self.images[0].kind
                )));
            }
            match (image.altitude, image.azimuth) {
                (Some(alt), Some(az)) => {
                    if !(-90.0..=90.0).contains(&alt) {
                        return Err(WallpaperError::validation(format!(
                            "image {i} altitude must be within -90..=90, got {alt}"
                        )));
                    }
                    if !(0.0..=360.0).contains(&az) {
                        return Err(WallpaperError::validation(format!(
                            "image {i} azimuth must be within 0..=360, got {az}"
                        )));
                    }
                }
                (None, None) => {}
                _ => {
                    return Err(WallpaperError::validation(format!(
                        "image {i} must give both altitude and azimuth, or neither"
                    )));
                }
            }
            if image.kind == EntryKind::Appearance && image.appearance.is_none() {
                return Err(WallpaperError::validation(format!(
                    "appearance image {i} needs an 'appearance' of light or dark"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/model.rs"]
mod tests;
