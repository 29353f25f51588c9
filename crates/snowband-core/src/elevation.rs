//! Vertical distribution of HRU forcing to elevation bands.
//!
//! Temperature follows a lapse rate, precipitation a linear gradient capped
//! at a maximum elevation. Total precipitation is then split into rain and
//! snow at band temperature.

use crate::forcing::{HruForcing, Precipitation, TimeStep};
use crate::snowpack::processes;
use crate::traits::VerticalGradients;

/// Default temperature gradient [C/100m].
pub const GRAD_T_DEFAULT: f64 = 0.6;

/// Default linear precipitation gradient [m^-1].
pub const GRAD_P_DEFAULT: f64 = 0.0004;

/// Elevation cap for precipitation extrapolation [m].
pub const ELEV_CAP_PRECIP: f64 = 4000.0;

/// Extrapolate temperature to a different elevation using lapse rate.
#[inline]
pub fn extrapolate_temp(temp: f64, input_elev: f64, target_elev: f64, gradient: f64) -> f64 {
    temp - gradient * (target_elev - input_elev) / 100.0
}

/// Extrapolate precipitation using a linear gradient.
/// Result clamped to >= 0.0 (linear can go negative for large negative dZ).
#[inline]
pub fn extrapolate_precip(precip: f64, input_elev: f64, target_elev: f64, gradient: f64) -> f64 {
    let eff_in = input_elev.min(ELEV_CAP_PRECIP);
    let eff_target = target_elev.min(ELEV_CAP_PRECIP);
    (precip * (1.0 + gradient * (eff_target - eff_in))).max(0.0)
}

/// Meteorology of one band for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandForcing {
    pub tmin: f64,
    pub tmax: f64,
    pub tmean: f64,
    /// Rainfall [m].
    pub rain: f64,
    /// Snowfall [m water equivalent].
    pub snow: f64,
}

/// Apply the HRU gradients to obtain the forcing of a band at `band_elev`.
pub fn distribute(
    forcing: &HruForcing,
    hru_elev: f64,
    band_elev: f64,
    gradients: &VerticalGradients,
    step: TimeStep,
) -> BandForcing {
    let tmin = extrapolate_temp(forcing.tmin, hru_elev, band_elev, gradients.temperature);
    let tmax = extrapolate_temp(forcing.tmax, hru_elev, band_elev, gradients.temperature);
    let scale = |p: f64| extrapolate_precip(p, hru_elev, band_elev, gradients.precipitation);

    let (rain, snow) = match forcing.precipitation {
        Precipitation::Total(p) => {
            processes::partition_precipitation(scale(p), tmin, tmax, gradients.threshold, step)
        }
        Precipitation::Split { rain, snow } => (scale(rain), scale(snow)),
    };

    BandForcing {
        tmin,
        tmax,
        tmean: 0.5 * (tmin + tmax),
        rain,
        snow,
    }
}
