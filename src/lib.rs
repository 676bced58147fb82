//! dynawall composes dynamic desktop wallpapers.
//!
//! A wallpaper bundle is one multi-image HEIF file. Its primary frame carries an XMP tag in the
//! `apple_desktop` namespace that tells the desktop which frame to show for a given sun
//! position, time of day or light/dark appearance.
//!
//! - Describe frames as [`ImageAttributes`] (or load a [`WallpaperManifest`])
//! - Build the bundle with [`create_wallpaper`] / [`write_wallpaper`], or on a worker thread
//!   with [`spawn_wallpaper_job`]
//! - Read a bundle back with [`inspect`]
//!
//! The [`solar`] module computes sun positions for a place and local time.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bundle;
mod container;
mod format;
mod foundation;
mod manifest;
mod metadata;
mod pipeline;
mod settings;
pub mod solar;

pub use crate::foundation::error::{
    FileError, ImageError, MetadataError, StorageError, WallpaperError, WallpaperResult,
};

pub use crate::bundle::assemble::{
    BundleInfo, DEFAULT_JPEG_QUALITY, FrameInfo, Progress, WallpaperOptions, assemble, inspect,
};
pub use crate::bundle::frame::{frame_from_bytes, load_frame};
pub use crate::container::bmff::FourCc;
pub use crate::container::heif::{
    CodedImage, HeifContainer, HeifWriter, ItemInfo, XMP_CONTENT_TYPE,
};
pub use crate::format::sniff::{HEIF_BRANDS, SourceFormat, classify, classify_path, validate};
pub use crate::manifest::model::{EntryKind, Location, ManifestImage, WallpaperManifest};
pub use crate::metadata::attributes::{Appearance, ImageAttributes, ImageKind};
pub use crate::metadata::encode::{
    AppearanceIndices, ImageMetadata, SerializedMetadata, SolarEntry, SolarMetadata, TimeEntry,
    TimeMetadata, day_fraction, encode,
};
pub use crate::metadata::exif::ExifMetadata;
pub use crate::metadata::xmp::{APPLE_DESKTOP_NS, APPLE_DESKTOP_PREFIX, XmpPacket};
pub use crate::pipeline::create::{
    create_wallpaper, ensure_parent_dir, reorder_primary_first, write_wallpaper,
};
pub use crate::pipeline::job::{WallpaperJob, spawn_wallpaper_job};
pub use crate::settings::store::{ENV_SETTINGS_PATH, LOCATION_KEY, SettingsStore};
