mod cost;
pub(crate) mod dijkstra;
mod planner;
mod snapping;
mod to_geojson;
mod validation;

pub use cost::CostModel;
pub use dijkstra::{ShortestPath, shortest_path};
pub use planner::RoutePlanner;
pub use snapping::snap_waypoint;
pub use validation::validate_waypoints;
