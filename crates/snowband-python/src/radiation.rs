use chrono::Duration;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::convert::{columns_to_dict, parse_date, to_py_err};

use snowband_core::basin::Aspect;
use snowband_core::forcing::TimeStep;
use snowband_core::radiation::{self, SlopeGeometry};

/// Radiation of a sloped surface over `n_steps` steps starting at `start`.
///
/// `aspect` is the 8-direction code (0 flat, 1 North, clockwise to 8).
/// Returns a dict of numpy arrays: potential_insolation, day_length, index.
#[pyfunction]
#[pyo3(signature = (latitude, slope, aspect, start, n_steps, hours=24))]
fn radiation_index<'py>(
    py: Python<'py>,
    latitude: f64,
    slope: f64,
    aspect: u8,
    start: &str,
    n_steps: usize,
    hours: u32,
) -> PyResult<Bound<'py, PyDict>> {
    let aspect = Aspect::from_code(aspect)
        .ok_or_else(|| PyValueError::new_err(format!("invalid aspect code {}", aspect)))?;
    let step = TimeStep::from_hours(hours).map_err(to_py_err)?;
    let start = parse_date(start)?;
    let geom = SlopeGeometry::new(latitude, slope, aspect.azimuth_deg());

    let mut insolation = Vec::with_capacity(n_steps);
    let mut day_length = Vec::with_capacity(n_steps);
    let mut index = Vec::with_capacity(n_steps);
    for t in 0..n_steps {
        let date = start + Duration::hours(t as i64 * hours as i64);
        let r = radiation::compute(&geom, date, step);
        insolation.push(r.potential_insolation);
        day_length.push(r.day_length);
        index.push(r.index);
    }

    columns_to_dict(
        py,
        &[
            ("potential_insolation", insolation.as_slice()),
            ("day_length", day_length.as_slice()),
            ("index", index.as_slice()),
        ],
    )
}

pub fn register(parent: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = parent.py();
    let m = PyModule::new(py, "radiation")?;
    m.add_function(wrap_pyfunction!(radiation_index, &m)?)?;
    parent.add_submodule(&m)?;
    Ok(())
}
