//! Path network model

pub mod components;
pub mod network;

pub use components::{ElevationStatus, PathEdge, PathNode};
pub use network::{IndexedPoint, PathGraph};
