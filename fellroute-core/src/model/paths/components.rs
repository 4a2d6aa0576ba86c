//! Path network components - nodes and edges

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{Meters, PathNodeId, model::Coordinate};

/// Whether a node's elevation has been looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationStatus {
    /// Not annotated yet, elevation is 0
    #[default]
    Unset,
    /// Elevation holds a real value
    Resolved,
    /// Lookup failed, elevation stays 0 and the node contributes no gain or loss
    Unavailable,
}

/// Path graph node
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    /// OSM ID of the node
    pub id: PathNodeId,
    /// Node coordinates (x = lon, y = lat)
    pub geometry: Point<f64>,
    /// Elevation in meters, 0 unless resolved
    pub elevation: f64,
    pub elevation_status: ElevationStatus,
}

impl PathNode {
    pub fn new(id: PathNodeId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            geometry: Point::new(lon, lat),
            elevation: 0.0,
            elevation_status: ElevationStatus::Unset,
        }
    }

    #[must_use]
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self.elevation_status = ElevationStatus::Resolved;
        self
    }

    pub fn lat(&self) -> f64 {
        self.geometry.y()
    }

    pub fn lon(&self) -> f64 {
        self.geometry.x()
    }

    pub fn has_elevation(&self) -> bool {
        self.elevation_status == ElevationStatus::Resolved
    }

    pub fn needs_elevation(&self) -> bool {
        self.elevation_status == ElevationStatus::Unset
    }

    /// Record a lookup outcome; `None` flags the node as unavailable
    pub(crate) fn set_elevation(&mut self, elevation: Option<f64>) {
        match elevation {
            Some(value) => {
                self.elevation = value;
                self.elevation_status = ElevationStatus::Resolved;
            }
            None => {
                self.elevation = 0.0;
                self.elevation_status = ElevationStatus::Unavailable;
            }
        }
    }

    /// Coordinate of the node, carrying the elevation only when resolved
    pub fn coordinate(&self) -> Coordinate {
        let coord = Coordinate::new(self.lat(), self.lon());
        if self.has_elevation() {
            coord.with_elevation(self.elevation)
        } else {
            coord
        }
    }
}

/// Path graph edge (bidirectional path segment)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    pub from: PathNodeId,
    pub to: PathNodeId,
    /// Horizontal length in meters
    pub length_m: Meters,
}

impl PathEdge {
    pub fn new(from: PathNodeId, to: PathNodeId, length_m: Meters) -> Self {
        Self { from, to, length_m }
    }

    /// Edge whose length is the great-circle distance between its endpoints
    pub fn between(from: &PathNode, to: &PathNode) -> Self {
        let length = Coordinate::new(from.lat(), from.lon())
            .distance_m(&Coordinate::new(to.lat(), to.lon()));
        Self::new(from.id, to.id, length)
    }
}
