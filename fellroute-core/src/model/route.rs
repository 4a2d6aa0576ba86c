//! Planned route types returned to callers

use serde::{Deserialize, Serialize};

use super::coordinate::{Coordinate, Waypoint};
use super::profile::ElevationProfile;
use crate::{Meters, PathNodeId};

/// A waypoint matched to a node of the path network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnappedWaypoint {
    pub waypoint: Waypoint,
    /// Position of the waypoint in the caller's list
    pub index: usize,
    pub node_id: PathNodeId,
    /// Position of the chosen node
    pub snapped: Coordinate,
    pub snap_distance_m: Meters,
}

impl SnappedWaypoint {
    pub fn name(&self) -> &str {
        &self.waypoint.name
    }
}

/// A waypoint left out of the route because no path node was close enough
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWaypoint {
    pub name: String,
    pub index: usize,
    pub nearest_distance_m: Meters,
}

/// Planned path between two consecutive waypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from: String,
    pub to: String,
    pub node_ids: Vec<PathNodeId>,
    pub coordinates: Vec<Coordinate>,
    /// Distance from the start of the leg at each coordinate
    pub cumulative_m: Vec<Meters>,
    pub distance_m: Meters,
    pub ascent_m: Meters,
    pub descent_m: Meters,
    /// Selection cost of the leg under the cost model
    pub cost: f64,
}

impl Leg {
    pub fn start(&self) -> Option<&Coordinate> {
        self.coordinates.first()
    }

    pub fn end(&self) -> Option<&Coordinate> {
        self.coordinates.last()
    }

    /// Both waypoints snapped to the same node
    pub fn is_degenerate(&self) -> bool {
        self.node_ids.len() <= 1
    }
}

/// Ordered concatenation of legs through every planned waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<SnappedWaypoint>,
    pub legs: Vec<Leg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedWaypoint>,
    pub distance_m: Meters,
    pub ascent_m: Meters,
    pub descent_m: Meters,
}

impl Route {
    pub fn new(
        waypoints: Vec<SnappedWaypoint>,
        legs: Vec<Leg>,
        skipped: Vec<SkippedWaypoint>,
    ) -> Self {
        let distance_m = legs.iter().map(|leg| leg.distance_m).sum();
        let ascent_m = legs.iter().map(|leg| leg.ascent_m).sum();
        let descent_m = legs.iter().map(|leg| leg.descent_m).sum();
        Self {
            waypoints,
            legs,
            skipped,
            distance_m,
            ascent_m,
            descent_m,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    /// Full ordered coordinate sequence; shared leg boundaries appear once
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.legs
            .iter()
            .enumerate()
            .flat_map(|(i, leg)| leg.coordinates.iter().skip(usize::from(i > 0)))
            .copied()
            .collect()
    }

    /// Node ids along the route, shared leg boundaries appearing once
    pub fn node_ids(&self) -> Vec<PathNodeId> {
        self.legs
            .iter()
            .enumerate()
            .flat_map(|(i, leg)| leg.node_ids.iter().skip(usize::from(i > 0)))
            .copied()
            .collect()
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.legs.first().and_then(|leg| leg.start()).copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.legs.last().and_then(|leg| leg.end()).copied()
    }

    pub fn profile(&self) -> ElevationProfile {
        ElevationProfile::from_route(self)
    }
}
