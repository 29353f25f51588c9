use chrono::Duration;
use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::convert::{checked_matrix, checked_slice, parse_date, to_py_err};
use crate::snowpack::global_parameters;

use snowband_core::bands::BandGeometry;
use snowband_core::basin::{Aspect, Hru, LandCover};
use snowband_core::context::RunContext;
use snowband_core::forcing::{ForcingSeries, HruForcing, TimeStep};
use snowband_core::outputs::HruFluxesTimeseries;
use snowband_core::snowpack::constants::CELL_STATE_SIZE;
use snowband_core::snowpack::{ClassParameters, HruParameters, SnowState};
use snowband_core::traits::{ModelState, UniformGradients, VerticalGradients};
use snowband_core::SnowBandModel;

define_timeseries_result! {
    /// Per-HRU run results with typed numpy array attributes.
    pub struct HruResult from HruFluxesTimeseries {
        rain, snow, melt, runoff, swe, height, albedo, radiation_index,
    }
}

/// Run the snow band model over HRUs of one band each.
///
/// `tmin`, `tmax` and `precip` are `(n_steps, n_hrus)` arrays; `cover_fractions`
/// is `(n_hrus, 3)` and `melt_params` `(n_hrus, 6)` with threshold and rate
/// per group. Returns (per-HRU results, final state).
#[pyfunction]
#[allow(clippy::too_many_arguments)]
#[pyo3(signature = (
    hru_ids,
    elevations,
    areas,
    latitudes,
    cover_fractions,
    melt_params,
    tmin,
    tmax,
    precip,
    start,
    hours=24,
    slopes=None,
    aspects=None,
    params=None,
    temp_gradient=0.6,
    precip_gradient=0.0004,
    threshold=0.0,
    initial_state=None,
))]
fn snowband_run<'py>(
    py: Python<'py>,
    hru_ids: Vec<u32>,
    elevations: PyReadonlyArray1<'py, f64>,
    areas: PyReadonlyArray1<'py, f64>,
    latitudes: PyReadonlyArray1<'py, f64>,
    cover_fractions: PyReadonlyArray2<'py, f64>,
    melt_params: PyReadonlyArray2<'py, f64>,
    tmin: PyReadonlyArray2<'py, f64>,
    tmax: PyReadonlyArray2<'py, f64>,
    precip: PyReadonlyArray2<'py, f64>,
    start: &str,
    hours: u32,
    slopes: Option<PyReadonlyArray1<'py, f64>>,
    aspects: Option<Vec<u8>>,
    params: Option<PyReadonlyArray1<'py, f64>>,
    temp_gradient: f64,
    precip_gradient: f64,
    threshold: f64,
    initial_state: Option<PyReadonlyArray1<'py, f64>>,
) -> PyResult<(Vec<HruResult>, Bound<'py, PyArray1<f64>>)> {
    let n = hru_ids.len();
    let elevs = checked_slice(&elevations, n, "elevations")?;
    let areas = checked_slice(&areas, n, "areas")?;
    let lats = checked_slice(&latitudes, n, "latitudes")?;
    let slopes = match &slopes {
        Some(arr) => checked_slice(arr, n, "slopes")?.to_vec(),
        None => vec![0.0; n],
    };
    let aspects = match aspects {
        Some(codes) if codes.len() == n => codes
            .into_iter()
            .map(|c| {
                Aspect::from_code(c)
                    .ok_or_else(|| PyValueError::new_err(format!("invalid aspect code {}", c)))
            })
            .collect::<PyResult<Vec<_>>>()?,
        Some(codes) => {
            return Err(PyValueError::new_err(format!(
                "aspects must have {} elements, got {}",
                n,
                codes.len()
            )))
        }
        None => vec![Aspect::Flat; n],
    };

    let (fractions, rows) = checked_matrix(&cover_fractions, 3, "cover_fractions")?;
    let (melt, melt_rows) = checked_matrix(&melt_params, 6, "melt_params")?;
    let (tmin, n_steps) = checked_matrix(&tmin, n, "tmin")?;
    let (tmax, tmax_rows) = checked_matrix(&tmax, n, "tmax")?;
    let (precip, precip_rows) = checked_matrix(&precip, n, "precip")?;
    if rows != n || melt_rows != n || tmax_rows != n_steps || precip_rows != n_steps {
        return Err(PyValueError::new_err(
            "cover_fractions and melt_params need one row per HRU, forcing one row per step",
        ));
    }

    let hrus: Vec<Hru> = (0..n)
        .map(|i| Hru {
            slope: slopes[i],
            aspect: aspects[i],
            ..Hru::flat(hru_ids[i], lats[i], elevs[i], areas[i])
        })
        .collect();
    let hru_params = melt
        .chunks_exact(6)
        .map(|row| {
            let class = |k: usize| ClassParameters::new(row[2 * k], row[2 * k + 1]);
            Ok(HruParameters {
                classes: [class(0)?, class(1)?, class(2)?],
            })
        })
        .collect::<snowband_core::SnowResult<Vec<_>>>()
        .map_err(to_py_err)?;

    let steps = (0..n_steps)
        .map(|t| {
            (0..n)
                .map(|i| {
                    let k = t * n + i;
                    HruForcing::new(tmin[k], tmax[k], precip[k])
                })
                .collect()
        })
        .collect();
    let forcing = ForcingSeries::new(steps, n).map_err(to_py_err)?;

    let step = TimeStep::from_hours(hours).map_err(to_py_err)?;
    let start = parse_date(start)?;
    let end = start + Duration::hours(n_steps as i64 * hours as i64);
    let ctx = RunContext::new(start, end, step, hru_ids).map_err(to_py_err)?;
    let gradients = VerticalGradients {
        temperature: temp_gradient,
        precipitation: precip_gradient,
        threshold,
    };

    let fraction_rows: Vec<[f64; 3]> = fractions
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();
    let geometry = BandGeometry::single_band(elevs, areas, &fraction_rows).map_err(to_py_err)?;

    let mut model = SnowBandModel::new(
        ctx,
        geometry,
        global_parameters(params.as_ref())?,
        hru_params,
        &hrus,
        Box::new(UniformGradients(gradients)),
    )
    .map_err(to_py_err)?;
    if let Some(arr) = &initial_state {
        let state_len = n * LandCover::COUNT * CELL_STATE_SIZE;
        let state = SnowState::from_slice(checked_slice(arr, state_len, "initial_state")?)
            .map_err(PyValueError::new_err)?;
        model = model.with_state(state).map_err(to_py_err)?;
    }

    let outputs = model.run(&forcing).map_err(to_py_err)?;
    let results = outputs
        .hrus
        .into_iter()
        .map(|ts| HruResult::from_timeseries(py, ts))
        .collect();
    Ok((results, PyArray1::from_vec(py, model.state().to_vec())))
}

pub fn register(parent: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = parent.py();
    let m = PyModule::new(py, "model")?;
    m.add_function(wrap_pyfunction!(snowband_run, &m)?)?;
    m.add_class::<HruResult>()?;
    parent.add_submodule(&m)?;
    Ok(())
}
