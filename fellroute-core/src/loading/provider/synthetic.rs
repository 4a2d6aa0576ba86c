//! Offline grid network used for dry runs

use itertools::Itertools;
use log::{debug, info};

use super::NetworkProvider;
use crate::{
    Error, PathNodeId,
    model::{BoundingRegion, Coordinate, PathEdge, PathGraph, PathNode},
};

/// Grid spacing in degrees, roughly 100 m of latitude
const DEFAULT_SPACING_DEG: f64 = 0.001;
/// Upper bound on the number of grid nodes; the spacing is coarsened to fit
const DEFAULT_MAX_NODES: usize = 40_000;

/// Deterministic path network covering any requested region
///
/// The grid carries a smooth synthetic elevation surface so the cost model
/// has something to work with, and every anchor coordinate gets a node of
/// its own, which makes the anchors snappable at zero distance.
#[derive(Debug, Clone)]
pub struct SyntheticNetwork {
    anchors: Vec<Coordinate>,
    spacing_deg: f64,
    max_nodes: usize,
}

impl SyntheticNetwork {
    pub fn new(anchors: Vec<Coordinate>) -> Self {
        Self {
            anchors,
            spacing_deg: DEFAULT_SPACING_DEG,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }

    #[must_use]
    pub fn with_spacing(mut self, spacing_deg: f64) -> Self {
        self.spacing_deg = spacing_deg;
        self
    }

    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.max(4);
        self
    }

    /// Synthetic terrain: a few gentle hills around 250 m
    pub fn elevation_at(lat: f64, lon: f64) -> f64 {
        let ridge = (lat.to_radians() * 900.0).sin() * (lon.to_radians() * 700.0).cos();
        let swell = (lat.to_radians() * 230.0 + lon.to_radians() * 170.0).sin();
        250.0 + 120.0 * ridge + 40.0 * swell
    }

    /// Spacing that keeps the grid within the node budget
    fn effective_spacing(&self, height: f64, width: f64) -> f64 {
        let mut spacing = self.spacing_deg;
        while Self::dimension(height, spacing) * Self::dimension(width, spacing) > self.max_nodes {
            spacing *= 1.5;
        }
        spacing
    }

    fn dimension(extent: f64, spacing: f64) -> usize {
        (extent / spacing).ceil() as usize + 1
    }
}

impl NetworkProvider for SyntheticNetwork {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_path_graph(&self, region: &BoundingRegion) -> Result<PathGraph, Error> {
        if !(self.spacing_deg.is_finite() && self.spacing_deg > 0.0) {
            return Err(Error::InvalidData(format!(
                "Synthetic grid spacing must be positive, got {}",
                self.spacing_deg
            )));
        }
        let height = (region.north - region.south).max(0.0);
        let width = (region.east - region.west).max(0.0);
        let spacing = self.effective_spacing(height, width);
        let rows = Self::dimension(height, spacing);
        let cols = Self::dimension(width, spacing);
        debug!("Synthetic grid {rows}x{cols} at {spacing:.5} deg spacing");

        let grid_id =
            |row: usize, col: usize| -> PathNodeId { (row * cols + col) as PathNodeId + 1 };

        let mut nodes: Vec<PathNode> = (0..rows)
            .cartesian_product(0..cols)
            .map(|(row, col)| {
                let lat = (region.south + row as f64 * spacing).min(90.0);
                let lon = (region.west + col as f64 * spacing).min(180.0);
                PathNode::new(grid_id(row, col), lat, lon)
                    .with_elevation(Self::elevation_at(lat, lon))
            })
            .collect();

        let mut edges = Vec::with_capacity(rows * cols * 2);
        for (row, col) in (0..rows).cartesian_product(0..cols) {
            let here = &nodes[row * cols + col];
            if col + 1 < cols {
                edges.push(PathEdge::between(here, &nodes[row * cols + col + 1]));
            }
            if row + 1 < rows {
                edges.push(PathEdge::between(here, &nodes[(row + 1) * cols + col]));
            }
        }

        // Anchors get negative ids so they never collide with the grid
        for (i, anchor) in self.anchors.iter().enumerate() {
            if !region.contains(anchor) {
                debug!("Anchor {i} lies outside the synthetic region, skipped");
                continue;
            }
            let node = PathNode::new(-(i as PathNodeId) - 1, anchor.lat, anchor.lon)
                .with_elevation(Self::elevation_at(anchor.lat, anchor.lon));

            let row = (((anchor.lat - region.south) / spacing).floor() as usize).min(rows - 1);
            let col = (((anchor.lon - region.west) / spacing).floor() as usize).min(cols - 1);
            let corners = [row, (row + 1).min(rows - 1)]
                .into_iter()
                .cartesian_product([col, (col + 1).min(cols - 1)])
                .unique();
            for (r, c) in corners {
                edges.push(PathEdge::between(&node, &nodes[r * cols + c]));
            }
            nodes.push(node);
        }

        info!(
            "Built synthetic network: {} nodes, {} edges",
            nodes.len(),
            edges.len()
        );
        PathGraph::new(nodes, edges)
    }
}
