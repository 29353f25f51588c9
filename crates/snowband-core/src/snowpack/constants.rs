//! Snowpack numerical constants.
//!
//! Physical properties and fixed model values of the band snowpack.

/// Density of liquid water [kg/m3].
pub const RHO_WATER: f64 = 1000.0;

/// Specific heat of ice [J/kg/K].
pub const C_ICE: f64 = 2093.4;

/// Specific heat of liquid water [J/kg/K].
pub const C_WATER: f64 = 4184.0;

/// Latent heat of fusion [J/kg].
pub const LATENT_FUSION: f64 = 334_000.0;

/// Height given to a pack holding snow but no height [m].
pub const MIN_HEIGHT: f64 = 1e-6;

/// Stock under which the pack is considered gone [m].
pub const MIN_STOCK: f64 = 1e-6;

/// Fraction of `density * stock` the pack can hold as liquid water [-].
pub const RETENTION_FACTOR: f64 = 0.1;

/// Albedo of fresh snow, also the albedo upper bound [-].
pub const ALBEDO_FRESH: f64 = 0.8;

/// Albedo reached by old snow [-].
pub const ALBEDO_OLD: f64 = 0.5;

/// Albedo of snow-free ground [-].
pub const ALBEDO_GROUND: f64 = 0.15;

/// Lower bound of the snow thermal conductivity [W/m/K].
pub const MIN_CONDUCTIVITY: f64 = 0.01;

/// Fresh snow density coefficients (Hedstrom & Pomeroy):
/// `rho = A + B * exp(T / C)` [kg/m3].
pub const FRESH_DENSITY_A: f64 = 67.92;
pub const FRESH_DENSITY_B: f64 = 51.25;
pub const FRESH_DENSITY_C: f64 = 2.59;

/// Per-group parameter names in canonical order.
pub const CLASS_PARAM_NAMES: &[&str] = &["melt_threshold", "melt_rate"];

/// Per-group parameter bounds as (min, max) tuples, in CLASS_PARAM_NAMES order.
pub const CLASS_PARAM_BOUNDS: &[(f64, f64)] = &[
    (-5.0, 5.0), // melt_threshold [C]
    (0.0, 0.2),  // melt_rate [m/C/day]
];

/// Number of values per pack cell: stock, height, heat, water, albedo.
pub const CELL_STATE_SIZE: usize = 5;
