use crate::{
    Meters,
    model::{PathEdge, PathNode},
};

/// Elevation-aware edge cost
///
/// `cost = length + gain_penalty * climb + loss_penalty * drop`, where the
/// penalties are horizontal meters charged per vertical meter. A node without
/// a resolved elevation contributes no climb or drop to any edge touching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub gain_penalty: f64,
    pub loss_penalty: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            gain_penalty: 10.0,
            loss_penalty: 2.0,
        }
    }
}

impl CostModel {
    pub fn new(gain_penalty: f64, loss_penalty: f64) -> Self {
        Self {
            gain_penalty,
            loss_penalty,
        }
    }

    /// Signed elevation change from `from` to `to`, 0 unless both are resolved
    pub fn elevation_delta(from: &PathNode, to: &PathNode) -> f64 {
        if from.has_elevation() && to.has_elevation() {
            to.elevation - from.elevation
        } else {
            0.0
        }
    }

    /// Cost of traversing `edge` in the direction `from` -> `to`
    pub fn edge_cost(&self, edge: &PathEdge, from: &PathNode, to: &PathNode) -> f64 {
        let (ascent, descent) = Self::ascent_descent(from, to);
        edge.length_m + self.gain_penalty * ascent + self.loss_penalty * descent
    }

    pub fn ascent_descent(from: &PathNode, to: &PathNode) -> (Meters, Meters) {
        let delta = Self::elevation_delta(from, to);
        (delta.max(0.0), (-delta).max(0.0))
    }
}
