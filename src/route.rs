use fellroute_core::{Route, SmoothingMethod};
use pyo3::prelude::*;

use crate::to_py_err;

/// Route
///
/// A planned route through every waypoint that could be snapped to the path
/// network, in the order the waypoints were given.
///
/// Example:
///
/// .. code-block:: python
///
///     route = plan_route([("Catbells", 54.5685, -3.1699, "Summit"),
///                         ("High Spy", 54.5397, -3.1850, "Summit")], dry_run=True)
///     print(route.distance_km, route.ascent_m)
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyclass)]
#[pyclass(name = "Route")]
#[derive(Clone)]
pub struct PyRoute {
    pub(crate) route: Route,
}

#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pymethods)]
#[pymethods]
impl PyRoute {
    #[getter]
    fn distance_m(&self) -> f64 {
        self.route.distance_m
    }

    #[getter]
    fn distance_km(&self) -> f64 {
        self.route.distance_km()
    }

    #[getter]
    fn ascent_m(&self) -> f64 {
        self.route.ascent_m
    }

    #[getter]
    fn descent_m(&self) -> f64 {
        self.route.descent_m
    }

    #[getter]
    fn leg_count(&self) -> usize {
        self.route.legs.len()
    }

    /// Names of the waypoints the route passes through
    #[getter]
    fn waypoints(&self) -> Vec<String> {
        self.route
            .waypoints
            .iter()
            .map(|w| w.name().to_string())
            .collect()
    }

    /// `(name, nearest_distance_m)` for waypoints left out of the route
    #[getter]
    fn skipped(&self) -> Vec<(String, f64)> {
        self.route
            .skipped
            .iter()
            .map(|s| (s.name.clone(), s.nearest_distance_m))
            .collect()
    }

    /// Route geometry as `(lat, lon, elevation)` tuples
    fn coordinates(&self) -> Vec<(f64, f64, Option<f64>)> {
        self.route
            .coordinates()
            .into_iter()
            .map(|c| (c.lat, c.lon, c.elevation))
            .collect()
    }

    fn node_ids(&self) -> Vec<i64> {
        self.route.node_ids()
    }

    /// Elevation profile as `(distance_m, elevation)` pairs, gaps filled by
    /// linear interpolation over distance
    fn elevation_profile(&self) -> Vec<(f64, f64)> {
        let profile = self.route.profile();
        profile
            .points
            .iter()
            .map(|p| p.distance_m)
            .zip(profile.interpolated())
            .collect()
    }

    /// Ascent and descent after smoothing the profile.
    ///
    /// `method` is one of "gaussian", "median" or "moving_average".
    #[pyo3(signature = (method="gaussian", sigma=2.0))]
    fn smoothed_ascent_descent(&self, method: &str, sigma: f64) -> PyResult<(f64, f64)> {
        let method = match method {
            "gaussian" => SmoothingMethod::Gaussian,
            "median" => SmoothingMethod::Median,
            "moving_average" => SmoothingMethod::MovingAverage,
            other => {
                return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                    "Unknown smoothing method '{other}'"
                )));
            }
        };
        Ok(self.route.profile().smoothed_ascent_descent(method, sigma))
    }

    /// Route as a GeoJSON FeatureCollection string
    fn to_geojson(&self) -> PyResult<String> {
        self.route.to_geojson_string().map_err(to_py_err)
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.route).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Failed to serialize route: {e}"
            ))
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "Route({} legs, {:.2} km, +{:.0} m / -{:.0} m)",
            self.route.legs.len(),
            self.route.distance_km(),
            self.route.ascent_m,
            self.route.descent_m
        )
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }
}
