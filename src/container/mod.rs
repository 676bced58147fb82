pub mod bmff;
pub mod heif;
