//! NOAA solar position equations.
//!
//! The formulas are the ones used by the NOAA solar calculator spreadsheet (after Meeus,
//! *Astronomical Algorithms*). Inputs are a local wall-clock time plus the UTC offset and DST
//! offset that clock is running on.

use chrono::{NaiveDateTime, Timelike};

use crate::foundation::error::{WallpaperError, WallpaperResult};

const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;
const J2000_JULIAN_DAY: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const MINUTES_PER_DAY: f64 = 1_440.0;
/// Sun centre 50 arc-minutes below the horizon: refraction plus solar radius.
const SUNRISE_ZENITH_DEG: f64 = 90.833;

/// Observer and clock inputs for one solar position evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarInput {
    /// Latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Local wall-clock date and time.
    pub date: NaiveDateTime,
    /// Standard UTC offset of the local clock, in hours (east positive).
    pub utc_offset_hours: f64,
    /// Additional daylight saving offset in effect, in hours (usually `0` or `1`).
    pub dst_offset_hours: f64,
}

impl SolarInput {
    /// Bundle the five calculator inputs.
    pub fn new(
        latitude: f64,
        longitude: f64,
        date: NaiveDateTime,
        utc_offset_hours: f64,
        dst_offset_hours: f64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            date,
            utc_offset_hours,
            dst_offset_hours,
        }
    }

    fn total_offset_hours(&self) -> f64 {
        self.utc_offset_hours + self.dst_offset_hours
    }

    fn julian_century(&self) -> f64 {
        let offset_secs = (self.total_offset_hours() * 3600.0).round() as i64;
        let utc_secs = self.date.and_utc().timestamp() - offset_secs;
        let julian_day = utc_secs as f64 / 86_400.0 + UNIX_EPOCH_JULIAN_DAY;
        (julian_day - J2000_JULIAN_DAY) / DAYS_PER_JULIAN_CENTURY
    }

    fn local_minutes(&self) -> f64 {
        f64::from(self.date.time().num_seconds_from_midnight()) / 60.0
    }
}

/// Full result of a solar position evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarPosition {
    /// Refraction-corrected elevation above the horizon, in degrees.
    pub altitude: f64,
    /// Azimuth clockwise from north, in `[0, 360)` degrees.
    pub azimuth: f64,
    /// Solar declination, in degrees.
    pub declination: f64,
    /// Equation of time, in minutes.
    pub equation_of_time: f64,
    /// Hour angle, in degrees (negative before solar noon).
    pub hour_angle: f64,
}

/// Solar noon, sunrise and sunset in minutes after local midnight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunTimes {
    /// Local clock minutes of solar noon.
    pub solar_noon: f64,
    /// Local clock minutes of sunrise; `None` during polar day or polar night.
    pub sunrise: Option<f64>,
    /// Local clock minutes of sunset; `None` during polar day or polar night.
    pub sunset: Option<f64>,
}

struct SunGeometry {
    declination: f64,
    equation_of_time: f64,
}

fn sun_geometry(jc: f64) -> SunGeometry {
    let mean_long = (280.46646 + jc * (36000.76983 + jc * 0.0003032)).rem_euclid(360.0);
    let mean_anom = 357.52911 + jc * (35999.05029 - 0.0001537 * jc);
    let eccent = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);

    let eq_of_ctr = mean_anom.to_radians().sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * mean_anom).to_radians().sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * mean_anom).to_radians().sin() * 0.000289;
    let true_long = mean_long + eq_of_ctr;

    let omega = 125.04 - 1934.136 * jc;
    let apparent_long = true_long - 0.00569 - 0.00478 * omega.to_radians().sin();

    let mean_obliq =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let obliq_corr = mean_obliq + 0.00256 * omega.to_radians().cos();

    let declination = (obliq_corr.to_radians().sin() * apparent_long.to_radians().sin())
        .asin()
        .to_degrees();

    let y = (obliq_corr / 2.0).to_radians().tan();
    let y = y * y;
    let l0 = mean_long.to_radians();
    let m = mean_anom.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccent * m.sin()
            + 4.0 * eccent * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccent * eccent * (2.0 * m).sin())
        .to_degrees();

    SunGeometry {
        declination,
        equation_of_time,
    }
}

fn refraction_correction(elevation: f64) -> f64 {
    if elevation > 85.0 {
        return 0.0;
    }
    let t = elevation.to_radians().tan();
    let arc_seconds = if elevation > 5.0 {
        58.1 / t - 0.07 / (t * t * t) + 0.000086 / (t * t * t * t * t)
    } else if elevation > -0.575 {
        1735.0
            + elevation * (-518.2 + elevation * (103.4 + elevation * (-12.79 + elevation * 0.711)))
    } else {
        -20.772 / t
    };
    arc_seconds / 3600.0
}

/// Evaluate the sun position for `input`.
pub fn position(input: &SolarInput) -> SolarPosition {
    let geo = sun_geometry(input.julian_century());
    let lat = input.latitude.to_radians();
    let decl = geo.declination.to_radians();

    let true_solar_time = (input.local_minutes() + geo.equation_of_time + 4.0 * input.longitude
        - 60.0 * input.total_offset_hours())
    .rem_euclid(MINUTES_PER_DAY);
    let hour_angle = if true_solar_time / 4.0 < 0.0 {
        true_solar_time / 4.0 + 180.0
    } else {
        true_solar_time / 4.0 - 180.0
    };

    let zenith = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.to_radians().cos())
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    let elevation = 90.0 - zenith;
    let altitude = elevation + refraction_correction(elevation);

    let zen = zenith.to_radians();
    let az = ((lat.sin() * zen.cos() - decl.sin()) / (lat.cos() * zen.sin()))
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();
    let azimuth = if hour_angle > 0.0 {
        (az + 180.0).rem_euclid(360.0)
    } else {
        (540.0 - az).rem_euclid(360.0)
    };

    SolarPosition {
        altitude,
        azimuth,
        declination: geo.declination,
        equation_of_time: geo.equation_of_time,
        hour_angle,
    }
}

/// Solar noon, sunrise and sunset for the day of `input`, as local clock minutes.
pub fn sun_times(input: &SolarInput) -> SunTimes {
    let geo = sun_geometry(input.julian_century());
    let lat = input.latitude.to_radians();
    let decl = geo.declination.to_radians();

    let solar_noon = 720.0 - 4.0 * input.longitude - geo.equation_of_time
        + input.total_offset_hours() * 60.0;
    let cos_ha = SUNRISE_ZENITH_DEG.to_radians().cos() / (lat.cos() * decl.cos())
        - lat.tan() * decl.tan();

    let (sunrise, sunset) = if (-1.0..=1.0).contains(&cos_ha) {
        let ha = cos_ha.acos().to_degrees();
        (Some(solar_noon - ha * 4.0), Some(solar_noon + ha * 4.0))
    } else {
        (None, None)
    };

    SunTimes {
        solar_noon,
        sunrise,
        sunset,
    }
}

/// Sun altitude in degrees for the given observer and local clock time.
pub fn altitude(
    latitude: f64,
    longitude: f64,
    date: NaiveDateTime,
    utc_offset_hours: f64,
    dst_offset_hours: f64,
) -> f64 {
    position(&SolarInput::new(
        latitude,
        longitude,
        date,
        utc_offset_hours,
        dst_offset_hours,
    ))
    .altitude
}

/// Sun azimuth in degrees (clockwise from north) for the given observer and local clock time.
pub fn azimuth(
    latitude: f64,
    longitude: f64,
    date: NaiveDateTime,
    utc_offset_hours: f64,
    dst_offset_hours: f64,
) -> f64 {
    position(&SolarInput::new(
        latitude,
        longitude,
        date,
        utc_offset_hours,
        dst_offset_hours,
    ))
    .azimuth
}

/// Reject coordinates outside `[-90, 90]` latitude or `[-180, 180]` longitude.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> WallpaperResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(WallpaperError::validation(format!(
            "latitude {latitude} is outside [-90, 90]"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(WallpaperError::validation(format!(
            "longitude {longitude} is outside [-180, 180]"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/solar/noaa.rs"]
mod tests;
