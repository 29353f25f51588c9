use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::prelude::*;

use crate::convert::{checked_slice, contiguous_slice, to_py_err};

use snowband_core::forcing::TimeStep;
use snowband_core::snowpack::constants::CELL_STATE_SIZE;
use snowband_core::snowpack::{
    self, processes, CellFluxes, CellFluxesTimeseries, CellForcing, ClassParameters, SnowCell,
    SnowParameters,
};

/// Number of global parameters accepted by `params` arrays.
pub const N_GLOBAL_PARAMS: usize = 6;

// ---------------------------------------------------------------------------
// Typed pyclass result objects
// ---------------------------------------------------------------------------

define_timeseries_result! {
    /// Single-cell snowpack run results with typed numpy array attributes.
    pub struct SnowpackResult from CellFluxesTimeseries {
        rain, snow, melt, outflow, runoff,
    }
}

define_step_result! {
    /// Single-cell snowpack single-timestep flux results.
    pub struct SnowpackStepFluxes from CellFluxes {
        rain, snow, melt, outflow, runoff,
    }
}

/// Global parameters from `[max_density, compaction, albedo_threshold,
/// albedo_decay_solid, albedo_decay_liquid, ground_melt]`, defaults when `None`.
pub fn global_parameters(params: Option<&PyReadonlyArray1<'_, f64>>) -> PyResult<SnowParameters> {
    let mut p = SnowParameters::default();
    if let Some(arr) = params {
        let s = checked_slice(arr, N_GLOBAL_PARAMS, "params")?;
        p.max_density = s[0];
        p.compaction = s[1];
        p.albedo_threshold = s[2];
        p.albedo_decay_solid = s[3];
        p.albedo_decay_liquid = s[4];
        p.ground_melt = s[5];
    }
    p.validate().map_err(to_py_err)?;
    Ok(p)
}

fn time_step(hours: u32) -> PyResult<TimeStep> {
    TimeStep::from_hours(hours).map_err(to_py_err)
}

fn cell_forcing(
    temp: f64,
    rain: f64,
    snow: f64,
    fraction: f64,
    radiation_index: f64,
) -> CellForcing {
    CellForcing {
        temp,
        rain,
        snow_depth: processes::fresh_snow_depth(snow, temp),
        snow_density: processes::fresh_snow_density(temp),
        fraction,
        radiation_index,
    }
}

fn initial_cell(state: Option<&PyReadonlyArray1<'_, f64>>) -> PyResult<SnowCell> {
    match state {
        Some(arr) => {
            let s = checked_slice(arr, CELL_STATE_SIZE, "state")?;
            Ok(SnowCell::from_array([s[0], s[1], s[2], s[3], s[4]]))
        }
        None => Ok(SnowCell::default()),
    }
}

/// Split precipitation into (rain, snow) at the given temperatures.
#[pyfunction]
#[pyo3(signature = (precip, tmin, tmax, threshold=0.0, hours=24))]
fn partition_precipitation(
    precip: f64,
    tmin: f64,
    tmax: f64,
    threshold: f64,
    hours: u32,
) -> PyResult<(f64, f64)> {
    Ok(processes::partition_precipitation(
        precip,
        tmin,
        tmax,
        threshold,
        time_step(hours)?,
    ))
}

/// Density of fresh snow [kg/m3] falling at `temp`.
#[pyfunction]
fn fresh_snow_density(temp: f64) -> f64 {
    processes::fresh_snow_density(temp)
}

/// Execute one step of the energy balance for a single cell.
///
/// `state` is `[stock, height, heat, water, albedo]`; `snow` is in metres of
/// water equivalent. Returns (new_state, fluxes).
#[pyfunction]
#[allow(clippy::too_many_arguments)]
#[pyo3(signature = (
    temp,
    rain,
    snow,
    melt_threshold,
    melt_rate,
    state=None,
    fraction=1.0,
    radiation_index=1.0,
    hours=24,
    params=None,
))]
fn snowpack_step<'py>(
    py: Python<'py>,
    temp: f64,
    rain: f64,
    snow: f64,
    melt_threshold: f64,
    melt_rate: f64,
    state: Option<PyReadonlyArray1<'py, f64>>,
    fraction: f64,
    radiation_index: f64,
    hours: u32,
    params: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<(Bound<'py, PyArray1<f64>>, SnowpackStepFluxes)> {
    let globals = global_parameters(params.as_ref())?;
    let class = ClassParameters::new(melt_threshold, melt_rate).map_err(to_py_err)?;
    let cell = initial_cell(state.as_ref())?;
    let forcing = cell_forcing(temp, rain, snow, fraction, radiation_index);

    let (next, fluxes) = snowpack::step(&cell, &forcing, &class, &globals, time_step(hours)?);
    Ok((
        PyArray1::from_slice(py, &next.to_array()),
        SnowpackStepFluxes::from_fluxes(&fluxes),
    ))
}

/// Run the energy balance of a single cell over a timeseries.
///
/// Returns (result, final_state).
#[pyfunction]
#[allow(clippy::too_many_arguments)]
#[pyo3(signature = (
    temp,
    rain,
    snow,
    melt_threshold,
    melt_rate,
    initial_state=None,
    fraction=1.0,
    radiation_index=None,
    hours=24,
    params=None,
))]
fn snowpack_run<'py>(
    py: Python<'py>,
    temp: PyReadonlyArray1<'py, f64>,
    rain: PyReadonlyArray1<'py, f64>,
    snow: PyReadonlyArray1<'py, f64>,
    melt_threshold: f64,
    melt_rate: f64,
    initial_state: Option<PyReadonlyArray1<'py, f64>>,
    fraction: f64,
    radiation_index: Option<PyReadonlyArray1<'py, f64>>,
    hours: u32,
    params: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<(SnowpackResult, Bound<'py, PyArray1<f64>>)> {
    let temp = contiguous_slice(&temp)?;
    let n = temp.len();
    let rain = checked_slice(&rain, n, "rain")?;
    let snow = checked_slice(&snow, n, "snow")?;
    let ri = match &radiation_index {
        Some(arr) => checked_slice(arr, n, "radiation_index")?.to_vec(),
        None => vec![1.0; n],
    };

    let globals = global_parameters(params.as_ref())?;
    let class = ClassParameters::new(melt_threshold, melt_rate).map_err(to_py_err)?;
    let step = time_step(hours)?;
    let mut cell = initial_cell(initial_state.as_ref())?;

    let mut ts = CellFluxesTimeseries::with_capacity(n);
    for t in 0..n {
        let forcing = cell_forcing(temp[t], rain[t], snow[t], fraction, ri[t]);
        let (next, fluxes) = snowpack::step(&cell, &forcing, &class, &globals, step);
        ts.push(&fluxes);
        cell = next;
    }

    Ok((
        SnowpackResult::from_timeseries(py, ts),
        PyArray1::from_slice(py, &cell.to_array()),
    ))
}

pub fn register(parent: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = parent.py();
    let m = PyModule::new(py, "snowpack")?;
    m.add_function(wrap_pyfunction!(partition_precipitation, &m)?)?;
    m.add_function(wrap_pyfunction!(fresh_snow_density, &m)?)?;
    m.add_function(wrap_pyfunction!(snowpack_step, &m)?)?;
    m.add_function(wrap_pyfunction!(snowpack_run, &m)?)?;
    m.add_class::<SnowpackResult>()?;
    m.add_class::<SnowpackStepFluxes>()?;
    parent.add_submodule(&m)?;
    Ok(())
}
