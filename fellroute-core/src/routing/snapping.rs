use log::{debug, trace};

use crate::{
    Error, Meters, PathNodeId,
    model::{PathGraph, SnappedWaypoint, Waypoint},
};

/// Planar candidate distances may overstate the great-circle distance by this
/// many meters on top of the projection slack
const CANDIDATE_MARGIN_M: f64 = 1.0;

/// Snaps `waypoint` to the path node nearest to it by great-circle distance
///
/// Fails with [`Error::Snap`] if the nearest node is farther than
/// `threshold_m`, or if the graph has no nodes at all. Equidistant nodes are
/// resolved in favour of the lowest node id.
pub fn snap_waypoint(
    waypoint: &Waypoint,
    index: usize,
    graph: &PathGraph,
    threshold_m: Meters,
) -> Result<SnappedWaypoint, Error> {
    let coord = &waypoint.coordinate;
    let slack = graph.projection_slack(coord.lat);

    let mut best: Option<(Meters, PathNodeId)> = None;
    for (idx, planar) in graph.nearest_candidates(coord) {
        if let Some((best_distance, _)) = best
            && planar > slack * best_distance + CANDIDATE_MARGIN_M
        {
            break;
        }
        let Some(node) = graph.node_at(idx) else {
            continue;
        };
        let distance = coord.distance_m(&node.coordinate());
        trace!("Snap candidate {} at {distance:.2} m", node.id);
        let better = match best {
            None => true,
            Some((best_distance, best_id)) => {
                distance < best_distance || (distance == best_distance && node.id < best_id)
            }
        };
        if better {
            best = Some((distance, node.id));
        }
    }

    let Some((distance, node_id)) = best else {
        return Err(Error::Snap {
            waypoint: waypoint.name.clone(),
            index,
            nearest_distance_m: f64::INFINITY,
            threshold_m,
        });
    };
    if distance > threshold_m {
        return Err(Error::Snap {
            waypoint: waypoint.name.clone(),
            index,
            nearest_distance_m: distance,
            threshold_m,
        });
    }

    let snapped = graph
        .node(node_id)
        .map(|node| node.coordinate())
        .ok_or_else(|| Error::InvalidData(format!("Snapped node {node_id} vanished")))?;
    debug!(
        "Snapped '{}' to node {node_id} at {distance:.2} m",
        waypoint.name
    );
    Ok(SnappedWaypoint {
        waypoint: waypoint.clone(),
        index,
        node_id,
        snapped,
        snap_distance_m: distance,
    })
}
