//! Waypoint-to-route synthesis over a path network.
//!
//! Turns an ordered list of sparse waypoints (summits, points of interest)
//! into a continuous route along runner-usable paths, choosing legs with an
//! elevation-aware cost model. Path networks and node elevations come from
//! injected providers and are cached between planning sessions.

pub mod elevation;
pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;

pub use elevation::{
    AnnotationReport, ElevationAnnotator, ElevationCache, ElevationProvider, OpenMeteoElevation,
};
pub use loading::{
    CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore, NetworkCache, NetworkProvider,
    NetworkSource, OverpassNetwork, PlannerConfig, SnapPolicy, SyntheticNetwork,
};
pub use model::{
    BoundingRegion, Coordinate, ElevationProfile, ElevationStatus, Leg, PathEdge, PathGraph,
    PathNode, ProfileStats, Route, SkippedWaypoint, SmoothingMethod, SnappedWaypoint, Waypoint,
    WaypointKind,
};
pub use routing::{CostModel, RoutePlanner, snap_waypoint, validate_waypoints};

/// Identifier of a path network node (OSM node id for live data)
pub type PathNodeId = i64;
/// Horizontal or vertical distance in meters
pub type Meters = f64;

/// Elevation values outside this range are treated as failed lookups
pub const PLAUSIBLE_ELEVATION_M: std::ops::RangeInclusive<f64> = -500.0..=9000.0;
/// Decimal places used for elevation cache keys
pub const ELEVATION_KEY_PRECISION: i32 = 5;
