//! NOAA solar position calculator.
//!
//! Inputs are a place, a local wall-clock time and the clock's UTC and daylight saving offsets.
//! All angles are in degrees.

pub(crate) mod noaa;

pub use noaa::{
    SolarInput, SolarPosition, SunTimes, altitude, azimuth, position, sun_times,
    validate_coordinates,
};
