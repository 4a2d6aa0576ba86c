#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use fellroute_core::{
    BoundingRegion, Coordinate, ElevationAnnotator, ElevationCache, ElevationProvider, Error,
    MemoryCacheStore, NetworkCache, NetworkProvider, PathEdge, PathGraph, PathNode, RoutePlanner,
    SyntheticNetwork, Waypoint,
};

/// Provider standing in for an unreachable API
pub struct OfflineNetwork;

impl NetworkProvider for OfflineNetwork {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch_path_graph(&self, _: &BoundingRegion) -> Result<PathGraph, Error> {
        Err(Error::NetworkUnavailable("connection refused".into()))
    }
}

pub struct OfflineElevation;

impl ElevationProvider for OfflineElevation {
    fn name(&self) -> &str {
        "offline"
    }

    fn lookup(&self, coord: &Coordinate) -> Result<f64, Error> {
        Err(Error::ElevationLookup {
            lat: coord.lat,
            lon: coord.lon,
            reason: "connection refused".into(),
        })
    }
}

/// Counts fetches and delegates to a grid of unannotated nodes
pub struct CountingNetwork {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub annotated: bool,
}

impl CountingNetwork {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            annotated: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NetworkProvider for CountingNetwork {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch_path_graph(&self, region: &BoundingRegion) -> Result<PathGraph, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let graph = SyntheticNetwork::new(vec![]).fetch_path_graph(region)?;
        if self.annotated {
            return Ok(graph);
        }
        // Same layout with elevation stripped, so the annotator has work to do
        let nodes = graph
            .nodes()
            .map(|node| PathNode::new(node.id, node.lat(), node.lon()))
            .collect();
        PathGraph::new(nodes, graph.edges().copied().collect())
    }
}

/// Flat terrain at 200 m, counting every coordinate asked for
pub struct CountingElevation {
    pub lookups: AtomicUsize,
}

impl CountingElevation {
    pub fn new() -> Self {
        Self {
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ElevationProvider for CountingElevation {
    fn name(&self) -> &str {
        "counting"
    }

    fn lookup(&self, _: &Coordinate) -> Result<f64, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(200.0)
    }
}

pub fn planner(
    network: Arc<dyn NetworkProvider>,
    elevation: Arc<dyn ElevationProvider>,
) -> RoutePlanner {
    RoutePlanner::new(
        NetworkCache::new(Arc::new(MemoryCacheStore::new()), network),
        ElevationAnnotator::new(elevation, Arc::new(ElevationCache::new())),
    )
}

pub fn offline_planner() -> RoutePlanner {
    planner(Arc::new(OfflineNetwork), Arc::new(OfflineElevation))
}

/// A short fell round in the Lake District
pub fn fell_round() -> Vec<Waypoint> {
    vec![
        Waypoint::summit("Catbells", 54.5685, -3.1699),
        Waypoint::summit("Maiden Moor", 54.5555, -3.1810),
        Waypoint::summit("High Spy", 54.5397, -3.1850),
        Waypoint::new(
            "Rigghead Quarries",
            54.5301,
            -3.1790,
            fellroute_core::WaypointKind::PointOfInterest,
        ),
    ]
}

/// Two nodes joined by a single edge of `length_m`, both at `elevation`
pub fn single_edge_graph(length_m: f64, elevation: f64) -> (PathGraph, Coordinate, Coordinate) {
    let a = Coordinate::new(55.0, -3.0);
    // Along a meridian, so the great-circle distance matches the edge length
    let b = Coordinate::new(55.0 + length_m / 111_195.08, -3.0);
    let nodes = vec![
        PathNode::new(1, a.lat, a.lon).with_elevation(elevation),
        PathNode::new(2, b.lat, b.lon).with_elevation(elevation),
    ];
    let graph = PathGraph::new(nodes, vec![PathEdge::new(1, 2, length_m)]).expect("valid graph");
    (graph, a, b)
}
