/// Snowpack energy balance of one band and group for one step.
///
/// - `step()`: advance a [`SnowCell`] and report its water fluxes
use super::constants::{
    C_ICE, C_WATER, LATENT_FUSION, MIN_HEIGHT, MIN_STOCK, RETENTION_FACTOR, RHO_WATER,
};
use super::params::{ClassParameters, SnowParameters};
use super::processes;
use super::state::SnowCell;
use crate::forcing::TimeStep;
use snowband_macros::Fluxes;

/// Forcing of one band and group for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellForcing {
    /// Mean air temperature [C].
    pub temp: f64,
    /// Rainfall [m].
    pub rain: f64,
    /// Fresh snow depth [m].
    pub snow_depth: f64,
    /// Fresh snow density [kg/m3].
    pub snow_density: f64,
    /// Share of the HRU covered by this band and group [-].
    pub fraction: f64,
    /// Radiation index of the HRU [-].
    pub radiation_index: f64,
}

/// Water fluxes of one band and group for one step [m].
#[derive(Debug, Clone, Copy, PartialEq, Default, Fluxes)]
pub struct CellFluxes {
    pub rain: f64,
    /// Snowfall [m water equivalent].
    pub snow: f64,
    /// Melt leaving the pack, after retention.
    pub melt: f64,
    /// Water leaving the band: released melt, or rain on bare ground.
    pub outflow: f64,
    /// Outflow weighted by the band HRU fraction.
    pub runoff: f64,
}

/// Execute one step of the energy balance.
///
/// Returns (new_cell, fluxes).
pub fn step(
    cell: &SnowCell,
    forcing: &CellForcing,
    class: &ClassParameters,
    params: &SnowParameters,
    time_step: TimeStep,
) -> (SnowCell, CellFluxes) {
    let days = time_step.days();
    let temp = forcing.temp;
    let threshold = class.melt_threshold;
    let new_swe = forcing.snow_depth * forcing.snow_density / RHO_WATER;

    if cell.stock <= 0.0 && forcing.snow_depth <= 0.0 {
        let fluxes = CellFluxes {
            rain: forcing.rain,
            snow: 0.0,
            melt: 0.0,
            outflow: forcing.rain,
            runoff: forcing.rain * forcing.fraction,
        };
        return (*cell, fluxes);
    }

    let mut c = *cell;
    let prior_stock = c.stock;

    // 1. Height guard
    if c.stock > 0.0 && c.height <= 0.0 {
        c.height = MIN_HEIGHT;
    }

    // 2. Fresh snow
    c.stock += new_swe;
    c.height += forcing.snow_depth;
    c.heat += forcing.snow_density * C_ICE * forcing.snow_depth * temp.min(0.0);

    // 3. Density before the step
    let density = c.stock / c.height;

    // 4. Conductive cooling
    if temp < threshold {
        let pack_temp = c.heat / (RHO_WATER * C_ICE * c.stock);
        let cooled =
            processes::cool_pack(pack_temp, temp, c.height, density, time_step.seconds());
        c.heat = RHO_WATER * C_ICE * c.stock * cooled;
    }

    // 5. Refreeze retained water, add rain and ground heat
    c.stock += c.water;
    c.heat += RHO_WATER * LATENT_FUSION * c.water;
    c.water = 0.0;
    c.stock += forcing.rain;
    c.heat += RHO_WATER * forcing.rain * (LATENT_FUSION + C_WATER * temp.max(0.0));
    c.heat += RHO_WATER * LATENT_FUSION * params.ground_melt * days;

    // 6. Albedo
    c.albedo = processes::update_albedo(
        c.albedo,
        prior_stock,
        c.stock,
        new_swe,
        days,
        temp > threshold,
        params,
    );

    // 7. Radiation melt energy
    let melt_energy = processes::radiation_melt(
        class.melt_rate,
        temp,
        threshold,
        forcing.radiation_index,
        c.albedo,
        days,
    );
    c.heat += RHO_WATER * LATENT_FUSION * melt_energy;

    // 8. Compaction
    c.height = processes::compact(
        c.height,
        c.stock / c.height,
        params.max_density,
        params.compaction,
        days,
    );
    let mut density = c.stock / c.height;
    if density > params.max_density {
        density = params.max_density;
        c.height = c.stock / density;
    }

    // 9. Melt
    let mut melt = 0.0;
    if c.heat > 0.0 {
        melt = (c.heat / (RHO_WATER * LATENT_FUSION)).min(c.stock);
        c.stock -= melt;
        c.heat = 0.0;
        c.height -= (melt - forcing.rain).max(0.0) / density;
        if c.stock > 0.0 && (c.height <= 0.0 || c.stock / c.height > params.max_density) {
            c.height = c.stock / params.max_density;
        }
    }
    if c.stock < MIN_STOCK {
        melt += c.stock;
        c = SnowCell {
            albedo: c.albedo,
            ..SnowCell::default()
        };
    }

    // 10. Retention
    let retained = melt.min(RETENTION_FACTOR * c.density() * c.stock);
    c.water = retained;
    let released = melt - retained;

    let fluxes = CellFluxes {
        rain: forcing.rain,
        snow: new_swe,
        melt: released,
        outflow: released,
        runoff: released * forcing.fraction,
    };
    (c, fluxes)
}
