use log::debug;

use crate::{Error, model::Waypoint};

/// Checks the waypoint list before any network work starts
///
/// Requires between 2 and `max_points` waypoints, valid coordinates, and no
/// consecutive pair farther apart than `max_distance_km`.
pub fn validate_waypoints(
    waypoints: &[Waypoint],
    max_points: usize,
    max_distance_km: f64,
) -> Result<(), Error> {
    if waypoints.len() < 2 {
        return Err(Error::Validation {
            index: waypoints.len(),
            message: format!(
                "at least 2 waypoints are required, got {}",
                waypoints.len()
            ),
        });
    }
    if waypoints.len() > max_points {
        return Err(Error::Validation {
            index: max_points,
            message: format!(
                "too many waypoints ({} > {max_points})",
                waypoints.len()
            ),
        });
    }

    if let Some((index, waypoint)) = waypoints
        .iter()
        .enumerate()
        .find(|(_, waypoint)| !waypoint.coordinate.is_valid())
    {
        return Err(Error::Validation {
            index,
            message: format!(
                "waypoint '{}' has invalid coordinates ({}, {})",
                waypoint.name, waypoint.coordinate.lat, waypoint.coordinate.lon
            ),
        });
    }

    for (i, pair) in waypoints.windows(2).enumerate() {
        let distance_km = pair[0].coordinate.distance_m(&pair[1].coordinate) / 1000.0;
        if distance_km > max_distance_km {
            return Err(Error::Validation {
                index: i + 1,
                message: format!(
                    "distance between waypoint {} ('{}') and {} ('{}') is {distance_km:.2} km, exceeding limit of {max_distance_km} km",
                    i + 1,
                    pair[0].name,
                    i + 2,
                    pair[1].name,
                ),
            });
        }
    }

    debug!("Validated {} waypoints", waypoints.len());
    Ok(())
}
