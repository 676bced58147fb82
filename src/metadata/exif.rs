use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::Path,
    str::FromStr,
};

use chrono::{FixedOffset, NaiveDateTime};

use crate::foundation::error::{FileError, WallpaperResult};

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Capture facts read from a source image's EXIF block.
///
/// Extraction is best-effort: a missing or unreadable EXIF block yields `None` fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExifMetadata {
    /// GPS latitude in degrees, north positive.
    pub latitude: Option<f64>,
    /// GPS longitude in degrees, east positive.
    pub longitude: Option<f64>,
    /// Local capture time (`DateTimeOriginal`, falling back to `DateTime`).
    pub create_date: Option<NaiveDateTime>,
    /// UTC offset of `create_date` (`OffsetTimeOriginal`, falling back to `OffsetTime`).
    pub timezone: Option<FixedOffset>,
}

impl ExifMetadata {
    /// Read EXIF from the file at `path`. Fails only when the file itself cannot be read.
    pub fn read(path: &Path) -> WallpaperResult<Self> {
        let file = File::open(path).map_err(|e| FileError::content_not_obtained(path, e))?;
        let mut reader = BufReader::new(file);
        let meta = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Self::from_exif(&exif),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no usable exif block");
                Self::default()
            }
        };
        Ok(meta)
    }

    /// Read EXIF from in-memory container bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut reader = Cursor::new(bytes);
        exif::Reader::new()
            .read_from_container(&mut reader)
            .map(|exif| Self::from_exif(&exif))
            .unwrap_or_default()
    }

    fn from_exif(exif: &exif::Exif) -> Self {
        let ascii = |tag: exif::Tag| -> Option<String> {
            let field = exif.get_field(tag, exif::In::PRIMARY)?;
            match &field.value {
                exif::Value::Ascii(parts) => parts
                    .first()
                    .map(|p| String::from_utf8_lossy(p).trim().to_string()),
                _ => None,
            }
        };

        let create_date = ascii(exif::Tag::DateTimeOriginal)
            .or_else(|| ascii(exif::Tag::DateTime))
            .and_then(|s| parse_exif_date(&s));
        let timezone = ascii(exif::Tag::OffsetTimeOriginal)
            .or_else(|| ascii(exif::Tag::OffsetTime))
            .and_then(|s| FixedOffset::from_str(&s).ok());

        Self {
            latitude: gps_coordinate(exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef, 'S'),
            longitude: gps_coordinate(
                exif,
                exif::Tag::GPSLongitude,
                exif::Tag::GPSLongitudeRef,
                'W',
            ),
            create_date,
            timezone,
        }
    }

    /// `timezone` as fractional hours east of UTC.
    pub fn utc_offset_hours(&self) -> Option<f64> {
        self.timezone
            .map(|tz| f64::from(tz.local_minus_utc()) / 3600.0)
    }
}

fn parse_exif_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, EXIF_DATE_FORMAT).ok()
}

fn gps_coordinate(
    exif: &exif::Exif,
    value_tag: exif::Tag,
    ref_tag: exif::Tag,
    negative_ref: char,
) -> Option<f64> {
    let value = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let degrees = dms_to_degrees(&value.value)?;
    let negative = exif
        .get_field(ref_tag, exif::In::PRIMARY)
        .map(|f| f.display_value().to_string().contains(negative_ref))
        .unwrap_or(false);
    Some(if negative { -degrees } else { degrees })
}

/// Degrees/minutes/seconds rationals to decimal degrees.
fn dms_to_degrees(value: &exif::Value) -> Option<f64> {
    match value {
        exif::Value::Rational(parts) if parts.len() >= 3 => {
            Some(parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0)
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/exif.rs"]
mod tests;
