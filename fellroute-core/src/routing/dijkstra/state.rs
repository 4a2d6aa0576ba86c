use std::cmp::Ordering;

use petgraph::graph::NodeIndex;

#[derive(Copy, Clone, Debug)]
pub(super) struct State {
    pub(super) cost: f64,
    pub(super) node: NodeIndex,
}

// Min-heap by cost, then by node index so equal costs pop in a fixed order
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    #[test]
    fn pops_cheapest_then_lowest_index() {
        let mut heap = BinaryHeap::new();
        heap.push(State {
            cost: 2.0,
            node: NodeIndex::new(0),
        });
        heap.push(State {
            cost: 1.0,
            node: NodeIndex::new(7),
        });
        heap.push(State {
            cost: 1.0,
            node: NodeIndex::new(3),
        });
        let order: Vec<_> = std::iter::from_fn(|| heap.pop()).map(|s| s.node.index()).collect();
        assert_eq!(order, vec![3, 7, 0]);
    }
}
