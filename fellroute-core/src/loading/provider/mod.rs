//! Path network sources

mod overpass;
mod synthetic;

use serde::{Deserialize, Serialize};

pub use overpass::{DEFAULT_OVERPASS_URL, OverpassNetwork};
pub use synthetic::SyntheticNetwork;

use crate::{Error, model::BoundingRegion, model::PathGraph};

/// Where a planning session takes its path network from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkSource {
    /// Injected provider, fronted by the network cache
    Live,
    /// Deterministic grid built around the waypoints, no I/O
    Synthetic,
}

/// Produces the runner-usable path network inside a region
///
/// Implementations must return edges that are traversable in both
/// directions with haversine lengths, and nodes whose elevation is either
/// unset or already resolved.
pub trait NetworkProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_path_graph(&self, region: &BoundingRegion) -> Result<PathGraph, Error>;
}
