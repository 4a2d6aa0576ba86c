//! Path network graph with spatial index

use hashbrown::HashMap;
use log::trace;
use petgraph::graph::{NodeIndex, UnGraph};
use rstar::{RTree, primitives::GeomWithData};
use serde::{Deserialize, Serialize};

use super::components::{ElevationStatus, PathEdge, PathNode};
use crate::{Error, Meters, PathNodeId, model::Coordinate};

/// Node position projected to local planar meters, tagged with its graph index
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Meters per degree of latitude on the mean earth sphere
const METERS_PER_DEGREE: f64 = 111_195.08;
/// Lower bound for the longitude scale so projection stays finite near the poles
const MIN_LON_SCALE: f64 = 0.01;

/// Path network for a bounding region
///
/// Nodes are stored in ascending id order, so graph indices and every
/// traversal over them are deterministic for a given node/edge set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SerializedGraph", into = "SerializedGraph")]
pub struct PathGraph {
    pub(crate) graph: UnGraph<PathNode, PathEdge>,
    index: HashMap<PathNodeId, NodeIndex>,
    rtree: RTree<IndexedPoint>,
    reference_lat: f64,
    lat_range: (f64, f64),
}

impl PathGraph {
    /// Builds a graph, failing if an edge references a node that does not exist
    pub fn new(mut nodes: Vec<PathNode>, edges: Vec<PathEdge>) -> Result<Self, Error> {
        nodes.sort_by_key(|node| node.id);
        if let Some(pair) = nodes.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(Error::InvalidData(format!(
                "Duplicate path node id {}",
                pair[0].id
            )));
        }

        let mut graph = UnGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;

        for node in nodes {
            if !node.lat().is_finite() || !node.lon().is_finite() {
                return Err(Error::InvalidData(format!(
                    "Path node {} has non-finite coordinates",
                    node.id
                )));
            }
            min_lat = min_lat.min(node.lat());
            max_lat = max_lat.max(node.lat());
            let id = node.id;
            let idx = graph.add_node(node);
            index.insert(id, idx);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                return Err(Error::InvalidData(format!(
                    "Edge {} - {} references a node missing from the graph",
                    edge.from, edge.to
                )));
            };
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Edge {} - {} has invalid length {}",
                    edge.from, edge.to, edge.length_m
                )));
            }
            if from == to {
                trace!("Skipping self loop on node {}", edge.from);
                continue;
            }
            graph.add_edge(from, to, edge);
        }

        let (reference_lat, lat_range) = if min_lat.is_finite() {
            ((min_lat + max_lat) / 2.0, (min_lat, max_lat))
        } else {
            (0.0, (0.0, 0.0))
        };

        let mut path_graph = Self {
            graph,
            index,
            rtree: RTree::new(),
            reference_lat,
            lat_range,
        };
        path_graph.rtree = path_graph.build_rtree();
        Ok(path_graph)
    }

    pub fn empty() -> Self {
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
            rtree: RTree::new(),
            reference_lat: 0.0,
            lat_range: (0.0, 0.0),
        }
    }

    fn build_rtree(&self) -> RTree<IndexedPoint> {
        let points = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                IndexedPoint::new(self.project(node.lat(), node.lon()), idx)
            })
            .collect();
        RTree::bulk_load(points)
    }

    /// Equirectangular projection around the graph's mean latitude
    pub(crate) fn project(&self, lat: f64, lon: f64) -> [f64; 2] {
        let lon_scale = self.reference_lat.to_radians().cos().max(MIN_LON_SCALE);
        [
            lon * lon_scale * METERS_PER_DEGREE,
            lat * METERS_PER_DEGREE,
        ]
    }

    /// Upper bound on how much the planar projection can overstate a
    /// great-circle distance between `lat` and any node of the graph
    pub(crate) fn projection_slack(&self, lat: f64) -> f64 {
        let low = self.lat_range.0.min(lat).min(self.reference_lat);
        let high = self.lat_range.1.max(lat).max(self.reference_lat);
        let scale = |l: f64| l.to_radians().cos().max(MIN_LON_SCALE);
        // cos is largest at the latitude closest to the equator
        let widest = if low <= 0.0 && high >= 0.0 {
            1.0
        } else {
            scale(low).max(scale(high))
        };
        let narrowest = scale(low).min(scale(high));
        (widest / narrowest) * 1.01
    }

    /// Graph nodes ordered by increasing planar distance from `coord`
    pub(crate) fn nearest_candidates(
        &self,
        coord: &Coordinate,
    ) -> impl Iterator<Item = (NodeIndex, Meters)> + '_ {
        let query = self.project(coord.lat, coord.lon);
        self.rtree
            .nearest_neighbor_iter_with_distance_2(&query)
            .map(|(point, dist_2)| (point.data, dist_2.sqrt()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_index(&self, id: PathNodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: PathNodeId) -> Option<&PathNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    pub fn node_at(&self, idx: NodeIndex) -> Option<&PathNode> {
        self.graph.node_weight(idx)
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &PathNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &PathEdge> {
        self.graph.edge_weights()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut PathNode> {
        self.graph.node_weights_mut()
    }

    /// Number of nodes still waiting for an elevation lookup
    pub fn unannotated_count(&self) -> usize {
        self.nodes().filter(|node| node.needs_elevation()).count()
    }

    pub fn count_with_status(&self, status: ElevationStatus) -> usize {
        self.nodes()
            .filter(|node| node.elevation_status == status)
            .count()
    }

    /// Number of disconnected parts of the network
    pub fn connected_components(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }
}

impl Default for PathGraph {
    fn default() -> Self {
        Self::empty()
    }
}

/// Flat representation used by the cache stores
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedGraph {
    nodes: Vec<SerializedNode>,
    edges: Vec<PathEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedNode {
    id: PathNodeId,
    lat: f64,
    lon: f64,
    #[serde(default)]
    elevation: f64,
    #[serde(default)]
    status: ElevationStatus,
}

impl From<PathGraph> for SerializedGraph {
    fn from(graph: PathGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| SerializedNode {
                id: node.id,
                lat: node.lat(),
                lon: node.lon(),
                elevation: node.elevation,
                status: node.elevation_status,
            })
            .collect();
        let edges = graph.edges().copied().collect();
        Self { nodes, edges }
    }
}

impl TryFrom<SerializedGraph> for PathGraph {
    type Error = Error;

    fn try_from(value: SerializedGraph) -> Result<Self, Self::Error> {
        let nodes = value
            .nodes
            .into_iter()
            .map(|node| {
                let mut path_node = PathNode::new(node.id, node.lat, node.lon);
                path_node.elevation = node.elevation;
                path_node.elevation_status = node.status;
                path_node
            })
            .collect();
        PathGraph::new(nodes, value.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> PathGraph {
        let nodes = vec![
            PathNode::new(3, 55.002, -3.0),
            PathNode::new(1, 55.000, -3.0),
            PathNode::new(2, 55.001, -3.0),
        ];
        let edges = vec![PathEdge::new(1, 2, 111.0), PathEdge::new(2, 3, 111.0)];
        PathGraph::new(nodes, edges).unwrap()
    }

    #[test]
    fn nodes_are_sorted_by_id() {
        let graph = line_graph();
        let ids: Vec<_> = graph.nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let nodes = vec![PathNode::new(1, 55.0, -3.0)];
        let edges = vec![PathEdge::new(1, 2, 10.0)];
        assert!(matches!(
            PathGraph::new(nodes, edges),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let nodes = vec![PathNode::new(1, 55.0, -3.0), PathNode::new(1, 55.1, -3.0)];
        assert!(PathGraph::new(nodes, vec![]).is_err());
    }

    #[test]
    fn counts_components() {
        let nodes = vec![
            PathNode::new(1, 55.0, -3.0),
            PathNode::new(2, 55.001, -3.0),
            PathNode::new(3, 56.0, -3.0),
            PathNode::new(4, 56.001, -3.0),
        ];
        let edges = vec![PathEdge::new(1, 2, 111.0), PathEdge::new(3, 4, 111.0)];
        let graph = PathGraph::new(nodes, edges).unwrap();
        assert_eq!(graph.connected_components(), 2);
    }

    #[test]
    fn nearest_candidate_comes_first() {
        let graph = line_graph();
        let (idx, _) = graph
            .nearest_candidates(&Coordinate::new(55.0011, -3.0))
            .next()
            .unwrap();
        assert_eq!(graph.node_at(idx).unwrap().id, 2);
    }

    #[test]
    fn survives_json_round_trip() {
        let mut graph = line_graph();
        graph.nodes_mut().next().unwrap().set_elevation(Some(312.5));
        let json = serde_json::to_string(&graph).unwrap();
        let restored: PathGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.node_count(), 3);
        assert_eq!(restored.edge_count(), 2);
        let first = restored.node(1).unwrap();
        assert_eq!(first.elevation_status, ElevationStatus::Resolved);
        assert!((first.elevation - 312.5).abs() < f64::EPSILON);
    }
}
