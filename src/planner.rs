use std::{path::PathBuf, sync::Arc, time::Duration};

use fellroute_core::{
    ElevationAnnotator, ElevationCache, FileCacheStore, NetworkCache, OpenMeteoElevation,
    OverpassNetwork, PlannerConfig, RoutePlanner, SnapPolicy, Waypoint, WaypointKind,
    elevation::DEFAULT_OPEN_METEO_URL, loading::provider::DEFAULT_OVERPASS_URL,
};
use pyo3::prelude::*;

use crate::{route::PyRoute, to_py_err};

/// `(name, lat, lon, symbol)`; a symbol of "Summit" marks a summit
type WaypointTuple = (String, f64, f64, Option<String>);

fn to_waypoints(waypoints: Vec<WaypointTuple>) -> Vec<Waypoint> {
    waypoints
        .into_iter()
        .map(|(name, lat, lon, symbol)| {
            Waypoint::new(name, lat, lon, WaypointKind::from_symbol(symbol.as_deref()))
        })
        .collect()
}

/// RoutePlanner
///
/// Plans routes against live OpenStreetMap path data with elevations from
/// Open-Meteo. Path networks are cached in `cache_dir` and elevations in
/// `elevation_file`, so repeated planning in the same area is fast.
///
/// Example:
///
/// .. code-block:: python
///
///     planner = RoutePlanner(cache_dir="cache/networks")
///     route = planner.plan(waypoints, gain_penalty=12.0)
///     planner.save_elevation_cache()
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyclass)]
#[pyclass(name = "RoutePlanner")]
pub struct PyRoutePlanner {
    planner: RoutePlanner,
    elevations: Arc<ElevationCache>,
    elevation_file: PathBuf,
}

#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pymethods)]
#[pymethods]
impl PyRoutePlanner {
    #[new]
    #[pyo3(signature = (
        cache_dir=".fellroute/networks".to_string(),
        elevation_file=".fellroute/elevation.json".to_string(),
        overpass_url=DEFAULT_OVERPASS_URL.to_string(),
        elevation_url=DEFAULT_OPEN_METEO_URL.to_string(),
        timeout_s=180
    ))]
    pub fn new(
        cache_dir: String,
        elevation_file: String,
        overpass_url: String,
        elevation_url: String,
        timeout_s: u64,
    ) -> PyResult<Self> {
        let elevation_file = PathBuf::from(elevation_file);
        let elevations = Arc::new(ElevationCache::load(&elevation_file).map_err(to_py_err)?);
        let network = OverpassNetwork::new(overpass_url, Duration::from_secs(timeout_s))
            .map_err(to_py_err)?;
        let elevation = OpenMeteoElevation::new(elevation_url, Duration::from_secs(timeout_s))
            .map_err(to_py_err)?;

        let planner = RoutePlanner::new(
            NetworkCache::new(
                Arc::new(FileCacheStore::new(cache_dir)),
                Arc::new(network),
            ),
            ElevationAnnotator::new(Arc::new(elevation), elevations.clone()),
        );
        Ok(Self {
            planner,
            elevations,
            elevation_file,
        })
    }

    /// Plan a route through `waypoints`, a list of `(name, lat, lon, symbol)`.
    ///
    /// Raises `PlanningError` with the planner's message, e.g. for a waypoint
    /// too far from any path or an unreachable path network.
    ///
    /// The GIL is released while planning.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        waypoints,
        buffer_degrees=0.01,
        max_points=50,
        max_distance_km=20.0,
        snap_threshold_m=5.0,
        max_cache_age_days=7,
        force_refresh=false,
        dry_run=false,
        gain_penalty=10.0,
        loss_penalty=2.0,
        skip_unsnappable=false
    ))]
    pub fn plan(
        &self,
        py: Python<'_>,
        waypoints: Vec<WaypointTuple>,
        buffer_degrees: f64,
        max_points: usize,
        max_distance_km: f64,
        snap_threshold_m: f64,
        max_cache_age_days: u32,
        force_refresh: bool,
        dry_run: bool,
        gain_penalty: f64,
        loss_penalty: f64,
        skip_unsnappable: bool,
    ) -> PyResult<PyRoute> {
        let config = PlannerConfig {
            buffer_degrees,
            max_points,
            max_distance_km,
            snap_threshold_m,
            max_cache_age_days,
            force_refresh,
            dry_run,
            gain_penalty,
            loss_penalty,
            snap_policy: if skip_unsnappable {
                SnapPolicy::SkipUnsnappable
            } else {
                SnapPolicy::FailFast
            },
        };
        let waypoints = to_waypoints(waypoints);

        let route = py
            .detach(|| self.planner.plan_route(&waypoints, &config))
            .map_err(to_py_err)?;
        Ok(PyRoute { route })
    }

    /// Write cached elevations to `elevation_file`
    pub fn save_elevation_cache(&self) -> PyResult<()> {
        self.elevations
            .save(&self.elevation_file)
            .map_err(to_py_err)
    }

    /// Number of cached elevations
    pub fn cached_elevations(&self) -> usize {
        self.elevations.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "RoutePlanner(network={}, elevations={}, cached_elevations={})",
            self.planner.network().provider().name(),
            self.planner.annotator().provider().name(),
            self.elevations.len()
        )
    }
}

/// Plan a single route with a default planner and save its elevation cache.
///
/// Parameters
/// ----------
/// waypoints : list[tuple[str, float, float, str | None]]
///     Ordered `(name, lat, lon, symbol)` tuples
/// dry_run : bool, default=False
///     Plan on a synthetic network without any network access
/// gain_penalty : float, default=10.0
///     Horizontal meters charged per meter climbed
/// loss_penalty : float, default=2.0
///     Horizontal meters charged per meter descended
/// cache_dir : str
///     Directory for cached path networks
///
/// Returns
/// -------
/// Route
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (
    waypoints,
    dry_run=false,
    gain_penalty=10.0,
    loss_penalty=2.0,
    cache_dir=".fellroute/networks".to_string()
))]
pub fn plan_route(
    py: Python<'_>,
    waypoints: Vec<WaypointTuple>,
    dry_run: bool,
    gain_penalty: f64,
    loss_penalty: f64,
    cache_dir: String,
) -> PyResult<PyRoute> {
    let planner = PyRoutePlanner::new(
        cache_dir,
        ".fellroute/elevation.json".to_string(),
        DEFAULT_OVERPASS_URL.to_string(),
        DEFAULT_OPEN_METEO_URL.to_string(),
        180,
    )?;
    let defaults = PlannerConfig::default();
    let route = planner.plan(
        py,
        waypoints,
        defaults.buffer_degrees,
        defaults.max_points,
        defaults.max_distance_km,
        defaults.snap_threshold_m,
        defaults.max_cache_age_days,
        false,
        dry_run,
        gain_penalty,
        loss_penalty,
        false,
    )?;
    if !planner.elevations.is_empty() {
        planner.save_elevation_cache()?;
    }
    Ok(route)
}
