//! Data model for route synthesis
//!
//! Contains geographic primitives, the path network graph and the
//! planned route types handed back to callers.

pub mod coordinate;
pub mod paths;
pub mod profile;
pub mod route;

pub use coordinate::{BoundingRegion, Coordinate, Waypoint, WaypointKind};
pub use paths::{ElevationStatus, PathEdge, PathGraph, PathNode};
pub use profile::{ElevationProfile, ProfileStats, SmoothingMethod};
pub use route::{Leg, Route, SkippedWaypoint, SnappedWaypoint};
