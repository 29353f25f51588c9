#[macro_use]
mod macros;
mod convert;

mod model;
mod radiation;
mod snowpack;

use pyo3::prelude::*;

/// Register a submodule in sys.modules so `from parent.child import ...` works.
fn register_submodule(
    py: Python<'_>,
    parent_name: &str,
    child: &Bound<'_, PyModule>,
) -> PyResult<()> {
    let full_name = format!("{}.{}", parent_name, child.name()?);
    py.import("sys")?.getattr("modules")?.set_item(full_name, child)?;
    Ok(())
}

#[pyfunction]
fn rust_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    let parent_name = m.name()?.to_string();

    m.add_function(wrap_pyfunction!(rust_version, m)?)?;

    model::register(m)?;
    radiation::register(m)?;
    snowpack::register(m)?;

    // Register submodules in sys.modules for `from snowband._core.X import ...`
    for name in &["model", "radiation", "snowpack"] {
        let sub = m.getattr(*name)?;
        register_submodule(py, &parent_name, sub.downcast::<PyModule>()?)?;
    }

    Ok(())
}
