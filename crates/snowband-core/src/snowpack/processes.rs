/// Snowpack process functions.
///
/// Pure functions for each term of the band energy balance.
use super::constants::{
    ALBEDO_FRESH, ALBEDO_GROUND, ALBEDO_OLD, C_ICE, FRESH_DENSITY_A, FRESH_DENSITY_B,
    FRESH_DENSITY_C, MIN_CONDUCTIVITY, RHO_WATER,
};
use super::params::SnowParameters;
use crate::forcing::TimeStep;

/// Fraction of precipitation falling as rain.
///
/// Hourly steps switch on `tmin` alone; coarser steps interpolate linearly
/// between `tmin` and `tmax`.
pub fn rain_fraction(tmin: f64, tmax: f64, threshold: f64, step: TimeStep) -> f64 {
    if step.is_hourly() {
        return if tmin > threshold { 1.0 } else { 0.0 };
    }
    if tmin >= threshold {
        1.0
    } else if tmax < threshold {
        0.0
    } else {
        ((tmax - threshold) / (tmax - tmin)).clamp(0.0, 1.0)
    }
}

/// Split precipitation into rain and snow.
///
/// Returns (rain, snow).
pub fn partition_precipitation(
    precip: f64,
    tmin: f64,
    tmax: f64,
    threshold: f64,
    step: TimeStep,
) -> (f64, f64) {
    let rain = precip * rain_fraction(tmin, tmax, threshold, step);
    (rain, precip - rain)
}

/// Density of fresh snow [kg/m3] falling at `temp` (Hedstrom & Pomeroy).
pub fn fresh_snow_density(temp: f64) -> f64 {
    FRESH_DENSITY_A + FRESH_DENSITY_B * (temp.min(0.0) / FRESH_DENSITY_C).exp()
}

/// Depth [m] of `swe` metres of water equivalent falling at `temp`.
pub fn fresh_snow_depth(swe: f64, temp: f64) -> f64 {
    swe * RHO_WATER / fresh_snow_density(temp)
}

/// Effective thermal conductivity [W/m/K] of snow of relative density
/// `density` [g/cm3] (Sturm et al., 1997).
pub fn thermal_conductivity(density: f64) -> f64 {
    (0.138 - 1.01 * density + 3.233 * density * density).max(MIN_CONDUCTIVITY)
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Pack temperature after conduction toward the air for `seconds`.
///
/// Semi-infinite medium solution: a thin pack follows the air, a thick pack
/// keeps its temperature. The result never exceeds 0 C.
pub fn cool_pack(pack_temp: f64, air_temp: f64, height: f64, density: f64, seconds: f64) -> f64 {
    let diffusivity = thermal_conductivity(density) / (1000.0 * density * C_ICE);
    if !(diffusivity > 0.0 && seconds > 0.0) {
        return pack_temp.min(0.0);
    }
    let depth_ratio = height / (2.0 * (diffusivity * seconds).sqrt());
    (air_temp + (pack_temp - air_temp) * erf(depth_ratio)).min(0.0)
}

/// Updated albedo.
///
/// Old snow relaxes toward [`ALBEDO_OLD`] from either side at the solid or
/// liquid rate and is renewed by fresh snow. Bare ground starts from [`ALBEDO_GROUND`] and is
/// brightened by the current stock.
pub fn update_albedo(
    albedo: f64,
    prior_stock: f64,
    stock: f64,
    new_snow: f64,
    days: f64,
    melting: bool,
    params: &SnowParameters,
) -> f64 {
    let decay = if melting {
        params.albedo_decay_liquid
    } else {
        params.albedo_decay_solid
    };
    let renew = |swe: f64| (-swe / params.albedo_threshold).exp();

    let updated = if prior_stock > 0.0 {
        let aged = ALBEDO_OLD + (albedo - ALBEDO_OLD) * (-decay * days).exp();
        ALBEDO_FRESH - (ALBEDO_FRESH - aged) * renew(new_snow)
    } else {
        ALBEDO_GROUND + (ALBEDO_FRESH - ALBEDO_GROUND) * (1.0 - renew(stock))
    };
    updated.clamp(0.0, ALBEDO_FRESH)
}

/// Melt [m] driven by air temperature and absorbed radiation.
pub fn radiation_melt(
    melt_rate: f64,
    temp: f64,
    threshold: f64,
    radiation_index: f64,
    albedo: f64,
    days: f64,
) -> f64 {
    melt_rate * (temp - threshold).max(0.0) * radiation_index * (1.0 - albedo) * days
}

/// Height [m] after compaction toward the maximum density.
pub fn compact(height: f64, density: f64, max_density: f64, rate: f64, days: f64) -> f64 {
    let factor = (1.0 - density / max_density).max(0.0);
    height - height * rate * factor * days
}
