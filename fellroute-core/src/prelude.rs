pub use crate::{ELEVATION_KEY_PRECISION, PLAUSIBLE_ELEVATION_M};

// Re-export key components
pub use crate::elevation::{
    AnnotationReport, ElevationAnnotator, ElevationCache, ElevationProvider, OpenMeteoElevation,
};
pub use crate::loading::{
    CacheStore, FileCacheStore, MemoryCacheStore, NetworkCache, NetworkProvider, NetworkSource,
    OverpassNetwork, PlannerConfig, SnapPolicy, SyntheticNetwork,
};
pub use crate::model::{BoundingRegion, Coordinate, Route, Waypoint, WaypointKind};
pub use crate::routing::{CostModel, RoutePlanner};

// Core types for the path network
pub use crate::Meters;
pub use crate::PathNodeId;
pub use crate::model::{ElevationStatus, PathEdge, PathGraph, PathNode};
