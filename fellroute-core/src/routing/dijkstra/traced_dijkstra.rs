use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, hash_map::Entry};
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use super::state::State;
use crate::{model::PathGraph, routing::CostModel};

/// Least-cost path between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    /// Visited nodes, start and target included
    pub nodes: Vec<NodeIndex>,
    /// Traversed edges, one fewer than `nodes`
    pub edges: Vec<EdgeIndex>,
    pub cost: f64,
}

/// Dijkstra's algorithm from `start` to `target` under `cost_model`
///
/// Returns `None` when `target` lies in a different component. Stops as soon
/// as the target is settled.
pub fn shortest_path(
    graph: &PathGraph,
    cost_model: &CostModel,
    start: NodeIndex,
    target: NodeIndex,
) -> Option<ShortestPath> {
    let node_count = graph.graph.node_count();
    if start.index() >= node_count || target.index() >= node_count {
        return None;
    }
    if start == target {
        return Some(ShortestPath {
            nodes: vec![start],
            edges: Vec::new(),
            cost: 0.0,
        });
    }

    let estimated_nodes = node_count.min(4096);
    let mut costs: HashMap<NodeIndex, f64> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> =
        HashMap::with_capacity(estimated_nodes);
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    costs.insert(start, 0.0);
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if settled.put(node.index()) {
            continue;
        }
        if node == target {
            break;
        }

        let here = &graph.graph[node];
        for edge in graph.graph.edges(node) {
            let next = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            if settled.contains(next.index()) {
                continue;
            }

            let next_cost = cost + cost_model.edge_cost(edge.weight(), here, &graph.graph[next]);
            match costs.entry(next) {
                Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    predecessors.insert(next, (node, edge.id()));
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        predecessors.insert(next, (node, edge.id()));
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    if !settled.contains(target.index()) {
        return None;
    }

    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut current = target;
    while current != start {
        let &(prev, edge) = predecessors.get(&current)?;
        nodes.push(prev);
        edges.push(edge);
        current = prev;
    }
    nodes.reverse();
    edges.reverse();

    Some(ShortestPath {
        nodes,
        edges,
        cost: costs.get(&target).copied().unwrap_or_default(),
    })
}
