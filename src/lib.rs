use pyo3::{create_exception, exceptions::PyException, prelude::*};

use planner::{PyRoutePlanner, plan_route};
use route::PyRoute;

pub mod planner;
pub mod route;

/// A Python module implemented in Rust.
#[pymodule]
fn fellroute(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add("PlanningError", m.py().get_type::<PlanningError>())?;
    m.add_class::<PyRoutePlanner>()?;
    m.add_class::<PyRoute>()?;
    m.add_function(wrap_pyfunction!(plan_route, m)?)?;
    Ok(())
}

#[cfg(feature = "stubgen")]
pyo3_stub_gen::define_stub_info_gatherer!(stub_info);

create_exception!(
    fellroute,
    PlanningError,
    PyException,
    "Raised when a route cannot be planned."
);

pub(crate) fn to_py_err(err: fellroute_core::Error) -> PyErr {
    PlanningError::new_err(err.to_string())
}
