use std::path::PathBuf;

/// Convenience result type used across dynawall.
pub type WallpaperResult<T> = Result<T, WallpaperError>;

/// Top-level error taxonomy used by the public APIs.
#[derive(thiserror::Error, Debug)]
pub enum WallpaperError {
    /// Reading a file from disk failed.
    #[error(transparent)]
    File(#[from] FileError),

    /// Decoding, converting or containerising image data failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Building or parsing wallpaper metadata failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Persisted settings could not be read as requested.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid user-provided request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WallpaperError {
    /// Build a [`WallpaperError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`WallpaperError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// File access failures.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The file could not be opened or read.
    #[error("could not read '{}': {source}", path.display())]
    ContentNotObtained {
        /// Offending path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub(crate) fn content_not_obtained(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ContentNotObtained {
            path: path.into(),
            source,
        }
    }
}

/// Image decoding and container failures.
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    /// The output container could not be created (for example, no frames were supplied).
    #[error("image destination not created: {0}")]
    DestinationNotCreated(String),

    /// Input bytes are not a supported image, or the container could not be finalized.
    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),

    /// Item data referenced by a container could not be obtained.
    #[error("image data not obtained: {0}")]
    DataNotObtained(String),

    /// A decoded image could not be converted to the output codec.
    #[error("image not converted: {0}")]
    ImageNotConverted(String),
}

impl ImageError {
    pub(crate) fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidImageFormat(msg.into())
    }

    pub(crate) fn data_not_obtained(msg: impl Into<String>) -> Self {
        Self::DataNotObtained(msg.into())
    }
}

/// Metadata encoding and XMP failures.
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    /// The attribute list does not describe exactly one metadata variant.
    #[error("wrong metadata type: {0}")]
    WrongMetadataType(String),

    /// An XMP namespace could not be registered.
    #[error("namespace not registered: {0}")]
    NamespaceNotRegistered(String),

    /// An XMP tag could not be created.
    #[error("tag not created: {0}")]
    TagNotCreated(String),

    /// An XMP tag could not be set or serialized.
    #[error("tag not set: {0}")]
    TagNotSet(String),

    /// Stored metadata could not be decoded.
    #[error("malformed metadata: {0}")]
    Malformed(String),
}

impl MetadataError {
    pub(crate) fn wrong_type(msg: impl Into<String>) -> Self {
        Self::WrongMetadataType(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Settings store lookups.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// No value is stored under the key.
    #[error("no stored value for key '{0}'")]
    KeyNotFound(String),

    /// A value exists but has a different shape than requested.
    #[error("stored value for key '{key}' has the wrong type: {reason}")]
    InvalidType {
        /// Requested key.
        key: String,
        /// Deserializer message.
        reason: String,
    },
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
