pub mod attributes;
pub mod encode;
pub mod exif;
pub mod xmp;
