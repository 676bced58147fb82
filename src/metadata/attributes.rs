use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Light/dark appearance a frame stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    /// Shown while the system uses the light appearance.
    Light,
    /// Shown while the system uses the dark appearance.
    Dark,
}

/// What a frame is keyed to. All frames of one bundle share the same variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageKind {
    /// Sun position the frame depicts, in degrees.
    Solar {
        /// Elevation above the horizon.
        altitude: f64,
        /// Azimuth clockwise from north.
        azimuth: f64,
    },
    /// Local time of day the frame depicts; only the time component is used.
    Time {
        /// Local wall-clock date and time.
        date: NaiveDateTime,
    },
    /// Light/dark frame; the appearance comes from [`ImageAttributes::appearance`].
    Appearance,
}

impl ImageKind {
    /// Variant name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Solar { .. } => "solar",
            Self::Time { .. } => "time",
            Self::Appearance => "appearance",
        }
    }

    pub(crate) fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Per-source description of one frame in a bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAttributes {
    /// Source image file.
    pub path: PathBuf,
    /// Ordinal position in the output bundle.
    pub index: usize,
    /// Whether this frame is the bundle's primary frame.
    #[serde(default)]
    pub primary: bool,
    /// What the frame is keyed to.
    #[serde(flatten)]
    pub kind: ImageKind,
    /// Optional light/dark role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,
}

impl ImageAttributes {
    /// Build attributes for a non-primary frame without an appearance role.
    pub fn new(path: impl Into<PathBuf>, index: usize, kind: ImageKind) -> Self {
        Self {
            path: path.into(),
            index,
            primary: false,
            kind,
            appearance: None,
        }
    }

    /// Mark this frame as the primary frame.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Attach a light/dark role.
    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = Some(appearance);
        self
    }
}
