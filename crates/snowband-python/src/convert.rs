use chrono::NaiveDateTime;
use numpy::{PyUntypedArrayMethods, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use snowband_core::SnowError;

/// Date format accepted by the bindings.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Map a core error to `ValueError`.
pub fn to_py_err(err: SnowError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Parse `YYYY-MM-DD HH:MM`, or a bare `YYYY-MM-DD` at midnight.
pub fn parse_date(text: &str) -> PyResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| PyValueError::new_err(format!("invalid date '{}': {}", text, e)))
}

/// Validate that a numpy array is C-contiguous and return its slice.
pub fn contiguous_slice<'py>(arr: &'py PyReadonlyArray1<'py, f64>) -> PyResult<&'py [f64]> {
    arr.as_slice()
        .map_err(|_| PyValueError::new_err("array must be C-contiguous"))
}

/// Validate length + contiguity of a numpy array.
pub fn checked_slice<'py>(
    arr: &'py PyReadonlyArray1<'py, f64>,
    expected_len: usize,
    name: &str,
) -> PyResult<&'py [f64]> {
    let slice = contiguous_slice(arr)?;
    if slice.len() != expected_len {
        return Err(PyValueError::new_err(format!(
            "{} must have {} elements, got {}",
            name,
            expected_len,
            slice.len()
        )));
    }
    Ok(slice)
}

/// Validate the shape + contiguity of a 2D array, returned as a row-major slice.
pub fn checked_matrix<'py>(
    arr: &'py PyReadonlyArray2<'py, f64>,
    cols: usize,
    name: &str,
) -> PyResult<(&'py [f64], usize)> {
    let shape = arr.shape();
    if shape[1] != cols {
        return Err(PyValueError::new_err(format!(
            "{} must have {} columns, got {}",
            name, cols, shape[1]
        )));
    }
    let slice = arr
        .as_slice()
        .map_err(|_| PyValueError::new_err(format!("{} must be C-contiguous", name)))?;
    Ok((slice, shape[0]))
}

/// Named columns as a dict of numpy arrays.
pub fn columns_to_dict<'py>(
    py: Python<'py>,
    columns: &[(&str, &[f64])],
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (name, values) in columns {
        dict.set_item(*name, numpy::PyArray1::from_slice(py, values))?;
    }
    Ok(dict)
}
