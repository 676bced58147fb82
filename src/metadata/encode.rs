use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::MetadataError,
    metadata::attributes::{Appearance, ImageAttributes, ImageKind},
    metadata::xmp::{APPLE_DESKTOP_NS, APPLE_DESKTOP_PREFIX, XmpPacket},
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One frame of a solar bundle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarEntry {
    /// Frame index in the bundle.
    #[serde(rename = "i")]
    pub index: u32,
    /// Sun altitude in degrees.
    #[serde(rename = "a")]
    pub altitude: f64,
    /// Sun azimuth in degrees.
    #[serde(rename = "z")]
    pub azimuth: f64,
}

/// One frame of a time-of-day bundle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Frame index in the bundle.
    #[serde(rename = "i")]
    pub index: u32,
    /// Fraction of the day elapsed since local midnight, in `[0, 1)`.
    #[serde(rename = "t")]
    pub day_percentage: f64,
}

/// Indices of the frames shown in light and dark appearance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceIndices {
    /// Frame shown in light mode.
    #[serde(rename = "l")]
    pub light_index: u32,
    /// Frame shown in dark mode.
    #[serde(rename = "d")]
    pub dark_index: u32,
}

/// Property list stored under the `solar` key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarMetadata {
    /// Per-frame sun positions, in frame order.
    #[serde(rename = "si")]
    pub entries: Vec<SolarEntry>,
    /// Frames to use when the system forces light or dark appearance.
    #[serde(rename = "ap", default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<AppearanceIndices>,
}

/// Property list stored under the `h24` key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeMetadata {
    /// Per-frame day fractions, in frame order.
    #[serde(rename = "ti")]
    pub entries: Vec<TimeEntry>,
    /// Frames to use when the system forces light or dark appearance.
    #[serde(rename = "ap", default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<AppearanceIndices>,
}

/// Wallpaper metadata attached to the primary frame. Exactly one variant per bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageMetadata {
    /// Sun-position keyed bundle.
    Solar(SolarMetadata),
    /// Time-of-day keyed bundle.
    Time(TimeMetadata),
    /// Light/dark keyed bundle.
    Appearance(AppearanceIndices),
}

/// Encoded metadata ready to be stored as one XMP string property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedMetadata {
    /// XMP property name in the desktop namespace.
    pub key: &'static str,
    /// Base64 of the binary property list.
    pub value: String,
}

impl SerializedMetadata {
    /// Build the XMP packet carrying this tag.
    pub fn to_xmp(&self) -> Result<Vec<u8>, MetadataError> {
        let mut packet = XmpPacket::new();
        packet.register_namespace(APPLE_DESKTOP_NS, APPLE_DESKTOP_PREFIX)?;
        packet.set_tag(APPLE_DESKTOP_NS, self.key, &self.value)?;
        packet.to_bytes()
    }
}

impl ImageMetadata {
    /// XMP key of the solar variant.
    pub const SOLAR_KEY: &'static str = "solar";
    /// XMP key of the time-of-day variant.
    pub const TIME_KEY: &'static str = "h24";
    /// XMP key of the appearance variant.
    pub const APPEARANCE_KEY: &'static str = "apr";

    /// Derive metadata from a uniform attribute list.
    pub fn from_attributes(attributes: &[ImageAttributes]) -> Result<Self, MetadataError> {
        let first = attributes
            .first()
            .ok_or_else(|| MetadataError::wrong_type("no attributes to derive metadata from"))?;
        if let Some(other) = attributes.iter().find(|a| !a.kind.same_variant(&first.kind)) {
            return Err(mixed_types(&first.kind, &other.kind));
        }

        match first.kind {
            ImageKind::Solar { .. } => {
                let entries = attributes
                    .iter()
                    .map(|a| match a.kind {
                        ImageKind::Solar { altitude, azimuth } => Ok(SolarEntry {
                            index: frame_index(a.index)?,
                            altitude,
                            azimuth,
                        }),
                        other => Err(mixed_types(&first.kind, &other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Solar(SolarMetadata {
                    entries,
                    appearance: appearance_hint(attributes)?,
                }))
            }
            ImageKind::Time { .. } => {
                let entries = attributes
                    .iter()
                    .map(|a| match a.kind {
                        ImageKind::Time { date } => Ok(TimeEntry {
                            index: frame_index(a.index)?,
                            day_percentage: day_fraction(date.time()),
                        }),
                        other => Err(mixed_types(&first.kind, &other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Time(TimeMetadata {
                    entries,
                    appearance: appearance_hint(attributes)?,
                }))
            }
            ImageKind::Appearance => {
                if attributes.len() != 2 {
                    return Err(MetadataError::wrong_type(format!(
                        "appearance bundles need exactly two images, got {}",
                        attributes.len()
                    )));
                }
                appearance_hint(attributes)?
                    .map(Self::Appearance)
                    .ok_or_else(|| {
                        MetadataError::wrong_type(
                            "appearance bundles need one light and one dark image",
                        )
                    })
            }
        }
    }

    /// XMP property name for this variant.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Solar(_) => Self::SOLAR_KEY,
            Self::Time(_) => Self::TIME_KEY,
            Self::Appearance(_) => Self::APPEARANCE_KEY,
        }
    }

    /// Binary property list, base64 encoded.
    pub fn encode(&self) -> Result<SerializedMetadata, MetadataError> {
        let mut plist_bytes = Vec::new();
        let written = match self {
            Self::Solar(m) => plist::to_writer_binary(&mut plist_bytes, m),
            Self::Time(m) => plist::to_writer_binary(&mut plist_bytes, m),
            Self::Appearance(m) => plist::to_writer_binary(&mut plist_bytes, m),
        };
        written.map_err(|e| MetadataError::TagNotCreated(format!("property list: {e}")))?;

        Ok(SerializedMetadata {
            key: self.key(),
            value: BASE64.encode(plist_bytes),
        })
    }

    /// Inverse of [`ImageMetadata::encode`] for a tag read from a container.
    pub fn decode(key: &str, value: &str) -> Result<Self, MetadataError> {
        let bytes = BASE64
            .decode(value.trim())
            .map_err(|e| MetadataError::malformed(format!("base64: {e}")))?;
        let plist_err = |e: plist::Error| MetadataError::malformed(format!("property list: {e}"));

        match key {
            Self::SOLAR_KEY => Ok(Self::Solar(plist::from_bytes(&bytes).map_err(plist_err)?)),
            Self::TIME_KEY => Ok(Self::Time(plist::from_bytes(&bytes).map_err(plist_err)?)),
            Self::APPEARANCE_KEY => Ok(Self::Appearance(
                plist::from_bytes(&bytes).map_err(plist_err)?,
            )),
            other => Err(MetadataError::wrong_type(format!(
                "unknown wallpaper metadata key '{other}'"
            ))),
        }
    }

    /// Find and decode the wallpaper tag in an XMP packet, if present.
    pub fn from_xmp(packet: &XmpPacket) -> Result<Option<Self>, MetadataError> {
        for key in [Self::SOLAR_KEY, Self::TIME_KEY, Self::APPEARANCE_KEY] {
            if let Some(value) = packet.tag(APPLE_DESKTOP_NS, key) {
                return Self::decode(key, value).map(Some);
            }
        }
        Ok(None)
    }
}

/// Derive and encode metadata for `attributes` in one step.
pub fn encode(attributes: &[ImageAttributes]) -> Result<SerializedMetadata, MetadataError> {
    ImageMetadata::from_attributes(attributes)?.encode()
}

/// Seconds since local midnight over the length of a day. Midnight maps to `0.0`.
pub fn day_fraction(time: chrono::NaiveTime) -> f64 {
    let secs = f64::from(time.num_seconds_from_midnight())
        + f64::from(time.nanosecond().min(999_999_999)) / 1e9;
    secs / SECONDS_PER_DAY
}

fn mixed_types(first: &ImageKind, other: &ImageKind) -> MetadataError {
    MetadataError::wrong_type(format!(
        "mixed image types: {} and {}",
        first.name(),
        other.name()
    ))
}

fn frame_index(index: usize) -> Result<u32, MetadataError> {
    u32::try_from(index)
        .map_err(|_| MetadataError::wrong_type(format!("frame index {index} out of range")))
}

/// Light/dark pair when exactly one light and one dark frame are marked.
fn appearance_hint(
    attributes: &[ImageAttributes],
) -> Result<Option<AppearanceIndices>, MetadataError> {
    let with = |wanted: Appearance| {
        attributes
            .iter()
            .filter(|a| a.appearance == Some(wanted))
            .map(|a| a.index)
            .collect::<Vec<_>>()
    };
    match (with(Appearance::Light).as_slice(), with(Appearance::Dark).as_slice()) {
        ([light], [dark]) => Ok(Some(AppearanceIndices {
            light_index: frame_index(*light)?,
            dark_index: frame_index(*dark)?,
        })),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/encode.rs"]
mod tests;
