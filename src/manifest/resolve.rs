use std::path::Path;

use crate::{
    foundation::error::{WallpaperError, WallpaperResult},
    manifest::model::{EntryKind, Location, ManifestImage, WallpaperManifest},
    metadata::{
        attributes::{ImageAttributes, ImageKind},
        exif::ExifMetadata,
    },
    solar::noaa::{SolarInput, position, validate_coordinates},
};

impl WallpaperManifest {
    /// Turn the manifest into bundle attributes, filling in sun angles and capture times from
    /// the location, the solar calculator and each image's EXIF block.
    ///
    /// Relative image paths are joined onto `root`. Entry `i` gets index `i`.
    #[tracing::instrument(skip_all, fields(images = self.images.len()))]
    pub fn resolve(&self, root: &Path) -> WallpaperResult<Vec<ImageAttributes>> {
        self.validate()?;
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| resolve_image(self.location.as_ref(), root, index, image))
            .collect()
    }
}

fn resolve_image(
    location: Option<&Location>,
    root: &Path,
    index: usize,
    image: &ManifestImage,
) -> WallpaperResult<ImageAttributes> {
    let path = root.join(&image.path);
    let exif = if needs_exif(location, image) {
        ExifMetadata::read(&path)?
    } else {
        ExifMetadata::default()
    };
    let missing = |what: &str| {
        WallpaperError::validation(format!(
            "image {index} ('{}') has no {what}",
            path.display()
        ))
    };

    let kind = match image.kind {
        EntryKind::Solar => match (image.altitude, image.azimuth) {
            (Some(altitude), Some(azimuth)) => ImageKind::Solar { altitude, azimuth },
            _ => {
                let latitude = location
                    .map(|l| l.latitude)
                    .or(exif.latitude)
                    .ok_or_else(|| missing("latitude: set 'location' or GPS EXIF tags"))?;
                let longitude = location
                    .map(|l| l.longitude)
                    .or(exif.longitude)
                    .ok_or_else(|| missing("longitude: set 'location' or GPS EXIF tags"))?;
                validate_coordinates(latitude, longitude)?;
                let date = image
                    .taken_at
                    .or(exif.create_date)
                    .ok_or_else(|| missing("capture time: set 'taken_at' or EXIF date"))?;
                // EXIF offsets already include daylight saving.
                let configured = location
                    .and_then(|l| l.utc_offset_hours.map(|tz| (tz, l.dst_offset_hours)));
                let (utc_offset, dst_offset) = match configured {
                    Some(offsets) => offsets,
                    None => (
                        exif.utc_offset_hours().ok_or_else(|| {
                            missing("utc offset: set 'location.utc_offset_hours' or EXIF offset")
                        })?,
                        0.0,
                    ),
                };

                let sun = position(&SolarInput::new(
                    latitude, longitude, date, utc_offset, dst_offset,
                ));
                tracing::debug!(
                    index,
                    altitude = sun.altitude,
                    azimuth = sun.azimuth,
                    "computed sun position"
                );
                ImageKind::Solar {
                    altitude: sun.altitude,
                    azimuth: sun.azimuth,
                }
            }
        },
        EntryKind::Time => ImageKind::Time {
            date: image
                .taken_at
                .or(exif.create_date)
                .ok_or_else(|| missing("capture time: set 'taken_at' or EXIF date"))?,
        },
        EntryKind::Appearance => ImageKind::Appearance,
    };

    let mut attrs = ImageAttributes::new(path, index, kind);
    attrs.primary = image.primary;
    attrs.appearance = image.appearance;
    Ok(attrs)
}

/// Whether any field must come from the image's EXIF block.
fn needs_exif(location: Option<&Location>, image: &ManifestImage) -> bool {
    match image.kind {
        EntryKind::Solar => {
            let has_angles = image.altitude.is_some() && image.azimuth.is_some();
            let has_offset = location.is_some_and(|l| l.utc_offset_hours.is_some());
            !has_angles && !(has_offset && image.taken_at.is_some())
        }
        EntryKind::Time => image.taken_at.is_none(),
        EntryKind::Appearance => false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/resolve.rs"]
mod tests;
