//! Planning pipeline: validate, load network, annotate, snap, route legs

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use super::{CostModel, dijkstra::shortest_path, snap_waypoint, validate_waypoints};
use crate::{
    Error,
    elevation::ElevationAnnotator,
    loading::{
        NetworkCache, NetworkProvider, NetworkSource, PlannerConfig, SnapPolicy, SyntheticNetwork,
    },
    model::{
        BoundingRegion, Coordinate, Leg, PathGraph, Route, SkippedWaypoint, SnappedWaypoint,
        Waypoint,
    },
};

/// Entry point for planning routes
///
/// Owns the collaborators that outlive a single call: the network cache in
/// front of the live provider, and the elevation annotator with its cache.
pub struct RoutePlanner {
    network: NetworkCache,
    annotator: ElevationAnnotator,
}

impl RoutePlanner {
    pub fn new(network: NetworkCache, annotator: ElevationAnnotator) -> Self {
        Self { network, annotator }
    }

    pub fn network(&self) -> &NetworkCache {
        &self.network
    }

    pub fn annotator(&self) -> &ElevationAnnotator {
        &self.annotator
    }

    /// Plans a route through `waypoints` in the order given
    pub fn plan_route(
        &self,
        waypoints: &[Waypoint],
        config: &PlannerConfig,
    ) -> Result<Route, Error> {
        let start = Instant::now();
        config.validate()?;
        validate_waypoints(waypoints, config.max_points, config.max_distance_km)?;

        let anchors: Vec<Coordinate> = waypoints.iter().map(|w| w.coordinate).collect();
        let region = BoundingRegion::around(&anchors, config.buffer_degrees).ok_or_else(|| {
            Error::Validation {
                index: 0,
                message: "no waypoints to plan through".into(),
            }
        })?;
        info!(
            "Planning route through {} waypoints in region {}",
            waypoints.len(),
            region.cache_key()
        );

        let mut graph = match config.network_source() {
            NetworkSource::Synthetic => {
                info!("Dry run: using synthetic path network");
                SyntheticNetwork::new(anchors).fetch_path_graph(&region)?
            }
            NetworkSource::Live => self.network.ensure_graph(
                &region,
                config.max_cache_age_days,
                config.force_refresh,
            )?,
        };
        debug!(
            "Path network: {} nodes, {} edges, {} components",
            graph.node_count(),
            graph.edge_count(),
            graph.connected_components()
        );

        self.annotator.annotate(&mut graph);

        let route = route_on_graph(&graph, waypoints, config)?;
        info!(
            "Planned {:.2} km with {:.0} m ascent and {:.0} m descent in {:?}",
            route.distance_km(),
            route.ascent_m,
            route.descent_m,
            start.elapsed()
        );
        Ok(route)
    }

    /// Plans on a caller-supplied graph, skipping network loading and annotation
    pub fn plan_on_graph(
        graph: &PathGraph,
        waypoints: &[Waypoint],
        config: &PlannerConfig,
    ) -> Result<Route, Error> {
        config.validate()?;
        validate_waypoints(waypoints, config.max_points, config.max_distance_km)?;
        route_on_graph(graph, waypoints, config)
    }
}

fn route_on_graph(
    graph: &PathGraph,
    waypoints: &[Waypoint],
    config: &PlannerConfig,
) -> Result<Route, Error> {
    let cost_model = config.cost_model();
    let (snapped, skipped) = snap_all(graph, waypoints, config)?;
    if !skipped.is_empty() {
        check_bridged_legs(&snapped, config.max_distance_km)?;
    }

    // Legs only read the graph; errors are reported in waypoint order
    let legs = snapped
        .par_windows(2)
        .map(|pair| plan_leg(graph, &cost_model, &pair[0], &pair[1]))
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Route::new(snapped, legs, skipped))
}

fn snap_all(
    graph: &PathGraph,
    waypoints: &[Waypoint],
    config: &PlannerConfig,
) -> Result<(Vec<SnappedWaypoint>, Vec<SkippedWaypoint>), Error> {
    let mut snapped = Vec::with_capacity(waypoints.len());
    let mut skipped = Vec::new();
    let mut first_error = None;

    for (index, waypoint) in waypoints.iter().enumerate() {
        match snap_waypoint(waypoint, index, graph, config.snap_threshold_m) {
            Ok(snap) => snapped.push(snap),
            Err(e) if config.snap_policy == SnapPolicy::SkipUnsnappable => {
                warn!("Skipping waypoint: {e}");
                if let Error::Snap {
                    nearest_distance_m, ..
                } = &e
                {
                    skipped.push(SkippedWaypoint {
                        name: waypoint.name.clone(),
                        index,
                        nearest_distance_m: *nearest_distance_m,
                    });
                }
                first_error.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    if snapped.len() < 2 {
        return Err(first_error.unwrap_or_else(|| Error::Validation {
            index: snapped.len(),
            message: "fewer than 2 waypoints could be snapped".into(),
        }));
    }
    Ok((snapped, skipped))
}

/// Skipping a waypoint joins its neighbours into one leg, which must still
/// respect the distance limit between consecutive waypoints
fn check_bridged_legs(snapped: &[SnappedWaypoint], max_distance_km: f64) -> Result<(), Error> {
    for pair in snapped.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let distance_km = from
            .waypoint
            .coordinate
            .distance_m(&to.waypoint.coordinate)
            / 1000.0;
        if distance_km > max_distance_km {
            return Err(Error::Validation {
                index: to.index,
                message: format!(
                    "after skipping unsnappable waypoints, distance between waypoint {} ('{}') and {} ('{}') is {distance_km:.2} km, exceeding limit of {max_distance_km} km",
                    from.index + 1,
                    from.name(),
                    to.index + 1,
                    to.name(),
                ),
            });
        }
    }
    Ok(())
}

fn plan_leg(
    graph: &PathGraph,
    cost_model: &CostModel,
    from: &SnappedWaypoint,
    to: &SnappedWaypoint,
) -> Result<Leg, Error> {
    let missing = |id| Error::InvalidData(format!("Snapped node {id} is not in the graph"));
    let start = graph.node_index(from.node_id).ok_or_else(|| missing(from.node_id))?;
    let target = graph.node_index(to.node_id).ok_or_else(|| missing(to.node_id))?;

    let path = shortest_path(graph, cost_model, start, target).ok_or_else(|| Error::NoRoute {
        from: from.name().to_owned(),
        from_index: from.index,
        to: to.name().to_owned(),
        to_index: to.index,
    })?;

    let mut node_ids = Vec::with_capacity(path.nodes.len());
    let mut coordinates = Vec::with_capacity(path.nodes.len());
    let mut cumulative_m = Vec::with_capacity(path.nodes.len());
    let mut distance_m = 0.0;
    let mut ascent_m = 0.0;
    let mut descent_m = 0.0;

    for (i, &idx) in path.nodes.iter().enumerate() {
        let node = &graph.graph[idx];
        if i > 0 {
            let prev = &graph.graph[path.nodes[i - 1]];
            distance_m += graph.graph[path.edges[i - 1]].length_m;
            let (up, down) = CostModel::ascent_descent(prev, node);
            ascent_m += up;
            descent_m += down;
        }
        node_ids.push(node.id);
        coordinates.push(node.coordinate());
        cumulative_m.push(distance_m);
    }

    debug!(
        "Leg '{}' -> '{}': {} nodes, {distance_m:.0} m, +{ascent_m:.0}/-{descent_m:.0} m",
        from.name(),
        to.name(),
        node_ids.len()
    );
    Ok(Leg {
        from: from.name().to_owned(),
        to: to.name().to_owned(),
        node_ids,
        coordinates,
        cumulative_m,
        distance_m,
        ascent_m,
        descent_m,
        cost: path.cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathEdge, PathNode};

    fn ladder() -> PathGraph {
        let nodes = (0..5)
            .map(|i| {
                PathNode::new(i, 55.0 + i as f64 * 0.001, -3.0)
                    .with_elevation(100.0 + i as f64 * 10.0)
            })
            .collect::<Vec<_>>();
        let edges = nodes
            .windows(2)
            .map(|pair| PathEdge::between(&pair[0], &pair[1]))
            .collect();
        PathGraph::new(nodes, edges).unwrap()
    }

    #[test]
    fn legs_share_boundary_nodes() {
        let graph = ladder();
        let waypoints = [
            Waypoint::summit("A", 55.000, -3.0),
            Waypoint::summit("B", 55.002, -3.0),
            Waypoint::summit("C", 55.004, -3.0),
        ];
        let route =
            RoutePlanner::plan_on_graph(&graph, &waypoints, &PlannerConfig::default()).unwrap();
        assert_eq!(route.legs.len(), 2);
        assert_eq!(route.node_ids(), vec![0, 1, 2, 3, 4]);
        assert!((route.ascent_m - 40.0).abs() < 1e-9);
        assert_eq!(route.descent_m, 0.0);
        let leg = &route.legs[0];
        assert_eq!(leg.cumulative_m.len(), 3);
        assert!((leg.cumulative_m[2] - leg.distance_m).abs() < 1e-9);
    }

    #[test]
    fn same_node_gives_degenerate_leg() {
        let graph = ladder();
        let waypoints = [
            Waypoint::summit("A", 55.000, -3.0),
            Waypoint::summit("A again", 55.00001, -3.0),
            Waypoint::summit("B", 55.001, -3.0),
        ];
        let route =
            RoutePlanner::plan_on_graph(&graph, &waypoints, &PlannerConfig::default()).unwrap();
        assert!(route.legs[0].is_degenerate());
        assert_eq!(route.legs[0].distance_m, 0.0);
        assert_eq!(route.node_ids(), vec![0, 1]);
    }

    #[test]
    fn skip_policy_records_unsnappable_waypoints() {
        let graph = ladder();
        let waypoints = [
            Waypoint::summit("A", 55.000, -3.0),
            Waypoint::summit("Off path", 55.002, -2.99),
            Waypoint::summit("C", 55.004, -3.0),
        ];
        let fail_fast = RoutePlanner::plan_on_graph(&graph, &waypoints, &PlannerConfig::default());
        assert!(matches!(fail_fast, Err(Error::Snap { index: 1, .. })));

        let config = PlannerConfig {
            snap_policy: SnapPolicy::SkipUnsnappable,
            ..PlannerConfig::default()
        };
        let route = RoutePlanner::plan_on_graph(&graph, &waypoints, &config).unwrap();
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.skipped.len(), 1);
        assert_eq!(route.skipped[0].name, "Off path");
        assert_eq!(route.skipped[0].index, 1);
    }

    #[test]
    fn skip_policy_still_needs_two_waypoints() {
        let graph = ladder();
        let waypoints = [
            Waypoint::summit("A", 55.000, -3.0),
            Waypoint::summit("Off path", 55.002, -2.99),
        ];
        let config = PlannerConfig {
            snap_policy: SnapPolicy::SkipUnsnappable,
            ..PlannerConfig::default()
        };
        assert!(matches!(
            RoutePlanner::plan_on_graph(&graph, &waypoints, &config),
            Err(Error::Snap { .. })
        ));
    }

    #[test]
    fn skipped_waypoint_cannot_bridge_past_distance_limit() {
        // A straight path along a meridian, 0.15 degrees (about 16.7 km) per hop
        let nodes = vec![
            PathNode::new(1, 55.00, -3.0).with_elevation(200.0),
            PathNode::new(2, 55.15, -3.0).with_elevation(200.0),
            PathNode::new(3, 55.30, -3.0).with_elevation(200.0),
        ];
        let edges = vec![
            PathEdge::between(&nodes[0], &nodes[1]),
            PathEdge::between(&nodes[1], &nodes[2]),
        ];
        let graph = PathGraph::new(nodes, edges).unwrap();
        let waypoints = [
            Waypoint::summit("South Top", 55.00, -3.0),
            Waypoint::summit("Bog", 55.15, -2.99),
            Waypoint::summit("North Top", 55.30, -3.0),
        ];
        let config = PlannerConfig {
            snap_policy: SnapPolicy::SkipUnsnappable,
            ..PlannerConfig::default()
        };

        match RoutePlanner::plan_on_graph(&graph, &waypoints, &config) {
            Err(Error::Validation { index, message }) => {
                assert_eq!(index, 2);
                assert!(message.contains("'South Top'"), "{message}");
                assert!(message.contains("'North Top'"), "{message}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }

        let generous = PlannerConfig {
            max_distance_km: 40.0,
            ..config
        };
        let route = RoutePlanner::plan_on_graph(&graph, &waypoints, &generous).unwrap();
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.skipped[0].name, "Bog");
    }

    #[test]
    fn no_route_names_both_waypoint_positions() {
        let nodes = vec![
            PathNode::new(1, 55.000, -3.0),
            PathNode::new(2, 55.001, -3.0),
            PathNode::new(3, 55.010, -3.0),
        ];
        let graph =
            PathGraph::new(nodes.clone(), vec![PathEdge::between(&nodes[0], &nodes[1])]).unwrap();
        let waypoints = [
            Waypoint::summit("Car Park", 55.000, -3.0),
            Waypoint::summit("Cairn", 55.001, -3.0),
            Waypoint::summit("Car Park", 55.010, -3.0),
        ];
        match RoutePlanner::plan_on_graph(&graph, &waypoints, &PlannerConfig::default()) {
            Err(Error::NoRoute {
                from,
                from_index,
                to,
                to_index,
            }) => {
                assert_eq!((from.as_str(), from_index), ("Cairn", 1));
                assert_eq!((to.as_str(), to_index), ("Car Park", 2));
            }
            other => panic!("expected NoRoute, got {other:?}"),
        }
    }
}
