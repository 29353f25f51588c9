//! Potential insolation and radiation index on sloped terrain.
//!
//! Uses the equivalent-slope method: a slope of inclination `k` and azimuth
//! `A` at latitude `L` receives the same beam radiation as a horizontal
//! surface at latitude `L1` whose clock is shifted by `D1`. Both angles are
//! computed once per HRU ([`SlopeGeometry`]); the daily integral then has a
//! closed form.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::basin::Hru;
use crate::forcing::TimeStep;

/// Solar constant [W/m2].
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Earth angular velocity [rad/h].
const OMEGA: f64 = PI / 12.0;

/// Per-HRU orbital geometry, fixed for the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeGeometry {
    /// Latitude [rad].
    pub latitude: f64,
    /// Equivalent latitude of the slope [rad].
    pub equivalent_latitude: f64,
    /// Hour-angle offset of the slope [rad].
    pub longitude_offset: f64,
}

impl SlopeGeometry {
    pub fn new(latitude_deg: f64, slope: f64, aspect_deg: f64) -> Self {
        let lat = latitude_deg.to_radians();
        let k = slope.atan();
        let a = aspect_deg.to_radians();

        let equivalent_latitude = (k.cos() * lat.sin() + k.sin() * lat.cos() * a.cos())
            .clamp(-1.0, 1.0)
            .asin();
        let longitude_offset = (k.sin() * a.sin())
            .atan2(k.cos() * lat.cos() - k.sin() * lat.sin() * a.cos());

        Self {
            latitude: lat,
            equivalent_latitude,
            longitude_offset,
        }
    }

    pub fn for_hru(hru: &Hru) -> Self {
        Self::new(hru.latitude, hru.slope, hru.aspect.azimuth_deg())
    }

    /// Horizontal surface at the same latitude.
    pub fn horizontal(&self) -> Self {
        Self {
            latitude: self.latitude,
            equivalent_latitude: self.latitude,
            longitude_offset: 0.0,
        }
    }
}

/// Radiation quantities of one HRU for the current step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiationState {
    /// Daily mean potential insolation on the sloped surface [W/m2].
    pub potential_insolation: f64,
    /// Day length on a horizontal surface [h].
    pub day_length: f64,
    /// Sloped over horizontal potential insolation [-].
    pub index: f64,
}

impl Default for RadiationState {
    fn default() -> Self {
        Self {
            potential_insolation: 0.0,
            day_length: 0.0,
            index: 1.0,
        }
    }
}

/// Solar declination [rad] for day of year `julian_day`.
pub fn declination(julian_day: u32) -> f64 {
    0.4093 * (2.0 * PI * (julian_day as f64 - 81.0) / 365.0).sin()
}

/// Inverse relative Sun-Earth distance squared [-].
pub fn eccentricity(julian_day: u32) -> f64 {
    1.0 + 0.033 * (2.0 * PI * julian_day as f64 / 365.0).cos()
}

/// Half day length [h] at latitude `lat` [rad], within [0, 12].
pub fn half_day_length(lat: f64, decl: f64) -> f64 {
    let cos_h = (-lat.tan() * decl.tan()).clamp(-1.0, 1.0);
    (cos_h.acos() / OMEGA).clamp(0.0, 12.0)
}

/// Sunrise and sunset [h from solar noon] on the surface, clipped to the
/// horizontal day.
pub fn sun_window(geom: &SlopeGeometry, decl: f64) -> (f64, f64) {
    let flat = half_day_length(geom.latitude, decl);
    let eq = half_day_length(geom.equivalent_latitude, decl);
    let shift = geom.longitude_offset / OMEGA;
    let rise = (-eq - shift).max(-flat);
    let set = (eq - shift).min(flat);
    (rise, set)
}

/// Mean potential insolation [W/m2] received between `t1` and `t2`
/// [h from solar noon], averaged over `period` hours.
fn insolation(geom: &SlopeGeometry, decl: f64, ecc: f64, t1: f64, t2: f64, period: f64) -> f64 {
    if t2 <= t1 {
        return 0.0;
    }
    let h1 = t1 * OMEGA;
    let h2 = t2 * OMEGA;
    let l1 = geom.equivalent_latitude;
    let d = geom.longitude_offset;
    let integral = decl.sin() * l1.sin() * (h2 - h1)
        + decl.cos() * l1.cos() * ((h2 + d).sin() - (h1 + d).sin());
    (SOLAR_CONSTANT * ecc * integral / (period * OMEGA)).max(0.0)
}

/// Daily potential insolation [W/m2] on the surface.
pub fn daily_insolation(geom: &SlopeGeometry, julian_day: u32) -> f64 {
    let decl = declination(julian_day);
    let (rise, set) = sun_window(geom, decl);
    insolation(geom, decl, eccentricity(julian_day), rise, set, 24.0)
}

/// Potential insolation [W/m2] between local hours `start` and `end` [0..24].
pub fn window_insolation(geom: &SlopeGeometry, julian_day: u32, start: f64, end: f64) -> f64 {
    let decl = declination(julian_day);
    let (rise, set) = sun_window(geom, decl);
    let t1 = (start - 12.0).max(rise);
    let t2 = (end - 12.0).min(set);
    insolation(geom, decl, eccentricity(julian_day), t1, t2, end - start)
}

fn ratio(sloped: f64, horizontal: f64) -> f64 {
    if horizontal == 0.0 {
        1.0
    } else {
        (sloped / horizontal).abs()
    }
}

/// Radiation state of a surface for the step starting at `date`.
///
/// For sub-daily steps the index is the smaller of the daily value and the
/// value over the step's hour window.
pub fn compute(geom: &SlopeGeometry, date: NaiveDateTime, step: TimeStep) -> RadiationState {
    let day = date.ordinal();
    let flat = geom.horizontal();

    let sloped_24 = daily_insolation(geom, day);
    let flat_24 = daily_insolation(&flat, day);
    let mut index = ratio(sloped_24, flat_24);

    if step.is_sub_daily() {
        let start = date.hour() as f64;
        let end = start + step.hours() as f64;
        let sloped = window_insolation(geom, day, start, end);
        let horizontal = window_insolation(&flat, day, start, end);
        index = index.min(ratio(sloped, horizontal));
    }

    RadiationState {
        potential_insolation: sloped_24,
        day_length: 2.0 * half_day_length(geom.latitude, declination(day)),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    // -- astronomy --

    #[test]
    fn equinox_day_is_twelve_hours() {
        let decl = declination(81);
        assert!(decl.abs() < 1e-12);
        assert!((2.0 * half_day_length(46f64.to_radians(), decl) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn polar_night_and_day_are_clipped() {
        let winter = declination(355);
        let summer = declination(172);
        let lat = 80f64.to_radians();
        assert_eq!(half_day_length(lat, winter), 0.0);
        assert_eq!(half_day_length(lat, summer), 12.0);
    }

    // -- slope geometry --

    #[test]
    fn flat_surface_index_is_one() {
        let g = SlopeGeometry::new(46.0, 0.0, 0.0);
        let r = compute(&g, date(2, 15, 0), TimeStep::DAILY);
        assert!((r.index - 1.0).abs() < 1e-12);
        assert!(r.potential_insolation > 0.0);
    }

    #[test]
    fn south_slope_gets_more_winter_sun_than_north_slope() {
        let south = SlopeGeometry::new(46.0, 0.4, 180.0);
        let north = SlopeGeometry::new(46.0, 0.4, 0.0);
        let d = date(1, 15, 0);
        let rs = compute(&south, d, TimeStep::DAILY);
        let rn = compute(&north, d, TimeStep::DAILY);
        assert!(rs.index > 1.0);
        assert!(rn.index < 1.0);
        assert!(rs.potential_insolation > rn.potential_insolation);
    }

    #[test]
    fn east_and_west_slopes_are_symmetric_over_a_day() {
        let east = SlopeGeometry::new(46.0, 0.3, 90.0);
        let west = SlopeGeometry::new(46.0, 0.3, 270.0);
        let d = date(6, 1, 0);
        let re = compute(&east, d, TimeStep::DAILY);
        let rw = compute(&west, d, TimeStep::DAILY);
        assert!((re.index - rw.index).abs() < 1e-9);
    }

    #[test]
    fn night_window_keeps_daily_index() {
        let g = SlopeGeometry::new(46.0, 0.3, 180.0);
        let daily = compute(&g, date(3, 1, 0), TimeStep::DAILY);
        let step = TimeStep::from_hours(3).unwrap();
        let night = compute(&g, date(3, 1, 0), step);
        // No sun between 00h and 03h: horizontal insolation is zero, the
        // window ratio falls back to 1 and the daily value wins if lower.
        assert!((night.index - daily.index.min(1.0)).abs() < 1e-12);
    }

    #[test]
    fn sub_daily_index_never_exceeds_daily() {
        let g = SlopeGeometry::new(46.0, 0.5, 90.0);
        let step = TimeStep::from_hours(6).unwrap();
        let daily = compute(&g, date(4, 10, 0), TimeStep::DAILY).index;
        for h in [0, 6, 12, 18] {
            let r = compute(&g, date(4, 10, h), step);
            assert!(r.index <= daily + 1e-12);
        }
    }

    #[test]
    fn east_slope_is_favoured_in_the_morning() {
        let g = SlopeGeometry::new(46.0, 0.5, 90.0);
        let morning = window_insolation(&g, 100, 6.0, 12.0);
        let afternoon = window_insolation(&g, 100, 12.0, 18.0);
        assert!(morning > afternoon);
    }

    #[test]
    fn day_length_reported() {
        let g = SlopeGeometry::new(46.0, 0.0, 0.0);
        let r = compute(&g, date(6, 21, 0), TimeStep::DAILY);
        assert!(r.day_length > 15.0 && r.day_length < 16.5);
    }
}
