use thiserror::Error;

use crate::Meters;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid waypoints (at index {index}): {message}")]
    Validation { index: usize, message: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Path network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("Elevation lookup failed at ({lat:.5}, {lon:.5}): {reason}")]
    ElevationLookup { lat: f64, lon: f64, reason: String },
    #[error(
        "Waypoint '{waypoint}' (index {index}) is {nearest_distance_m:.1} m from the nearest path node (threshold {threshold_m:.1} m)"
    )]
    Snap {
        waypoint: String,
        index: usize,
        nearest_distance_m: Meters,
        threshold_m: Meters,
    },
    #[error(
        "No route between waypoint {from_index} ('{from}') and waypoint {to_index} ('{to}'): they are on disconnected parts of the path network"
    )]
    NoRoute {
        from: String,
        from_index: usize,
        to: String,
        to_index: usize,
    },
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::InvalidConfig(_) => "invalid_config",
            Error::NetworkUnavailable(_) => "network_unavailable",
            Error::ElevationLookup { .. } => "elevation_lookup",
            Error::Snap { .. } => "snap",
            Error::NoRoute { .. } => "no_route",
            Error::Cache(_) => "cache",
            Error::InvalidData(_) => "invalid_data",
            Error::IoError(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// Errors caused by the caller's input rather than by infrastructure
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::InvalidConfig(_)
                | Error::Snap { .. }
                | Error::NoRoute { .. }
        )
    }
}
