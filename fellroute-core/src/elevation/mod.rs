//! Node elevation annotation

mod cache;
mod open_meteo;

use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};

pub use cache::{ElevationCache, ElevationKey};
pub use open_meteo::{DEFAULT_OPEN_METEO_URL, OpenMeteoElevation};

use crate::{Error, PLAUSIBLE_ELEVATION_M, model::Coordinate, model::PathGraph};

/// Source of terrain elevation for arbitrary coordinates
pub trait ElevationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn lookup(&self, coord: &Coordinate) -> Result<f64, Error>;

    /// One result per input coordinate, in input order
    fn lookup_many(&self, coords: &[Coordinate]) -> Vec<Result<f64, Error>> {
        coords.iter().map(|coord| self.lookup(coord)).collect()
    }
}

/// Outcome of one annotation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Nodes whose elevation came from the cache
    pub cache_hits: usize,
    /// Distinct coordinates sent to the provider
    pub lookups: usize,
    /// Nodes that received an elevation in this pass
    pub resolved: usize,
    /// Nodes flagged unavailable in this pass
    pub unavailable: usize,
}

/// Fills in elevation for every node that has not been looked up yet
pub struct ElevationAnnotator {
    provider: Arc<dyn ElevationProvider>,
    cache: Arc<ElevationCache>,
}

impl ElevationAnnotator {
    pub fn new(provider: Arc<dyn ElevationProvider>, cache: Arc<ElevationCache>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &ElevationCache {
        &self.cache
    }

    pub fn provider(&self) -> &dyn ElevationProvider {
        self.provider.as_ref()
    }

    /// Annotates `Unset` nodes; resolved and unavailable nodes are left alone
    ///
    /// Never fails: a failed or implausible lookup flags the node as
    /// [`crate::ElevationStatus::Unavailable`] with elevation 0.
    pub fn annotate(&self, graph: &mut PathGraph) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        if graph.unannotated_count() == 0 {
            debug!("All nodes already carry elevation, nothing to annotate");
            return report;
        }

        let pending: Vec<ElevationKey> = graph
            .nodes()
            .filter(|node| node.needs_elevation())
            .map(|node| ElevationKey::from(&node.coordinate()))
            .collect();

        let misses: Vec<ElevationKey> = pending
            .iter()
            .filter(|key| self.cache.get(key).is_none())
            .copied()
            .unique()
            .collect();

        if !misses.is_empty() {
            info!(
                "Looking up elevation for {} coordinates via {}",
                misses.len(),
                self.provider.name()
            );
            let coords: Vec<Coordinate> = misses.iter().map(ElevationKey::coordinate).collect();
            let mut results = self.provider.lookup_many(&coords).into_iter();
            report.lookups = misses.len();

            let mut failures = 0usize;
            for key in &misses {
                match results.next() {
                    Some(Ok(value)) if is_plausible(value) => self.cache.insert(*key, value),
                    Some(Ok(value)) => {
                        failures += 1;
                        debug!("Discarding implausible elevation {value} at {key}");
                    }
                    Some(Err(e)) => {
                        failures += 1;
                        debug!("{e}");
                    }
                    None => {
                        failures += 1;
                        debug!("Provider returned no result for {key}");
                    }
                }
            }
            if failures > 0 {
                warn!(
                    "Elevation unavailable for {failures} of {} coordinates; affected nodes contribute no climb",
                    misses.len()
                );
            }
        }

        let missed: hashbrown::HashSet<ElevationKey> = misses.into_iter().collect();
        for node in graph.nodes_mut().filter(|node| node.needs_elevation()) {
            let key = ElevationKey::from(&node.coordinate());
            let value = self.cache.get(&key).filter(|value| is_plausible(*value));
            if value.is_some() {
                report.resolved += 1;
                if !missed.contains(&key) {
                    report.cache_hits += 1;
                }
            } else {
                report.unavailable += 1;
            }
            node.set_elevation(value);
        }

        info!(
            "Elevation annotation: {} resolved ({} from cache), {} unavailable, {} lookups",
            report.resolved, report.cache_hits, report.unavailable, report.lookups
        );
        report
    }
}

fn is_plausible(value: f64) -> bool {
    value.is_finite() && PLAUSIBLE_ELEVATION_M.contains(&value)
}
