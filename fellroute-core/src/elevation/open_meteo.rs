//! Batched elevation lookups against an Open-Meteo compatible API

use std::time::Duration;

use itertools::Itertools;
use log::{debug, warn};
use serde::Deserialize;

use super::ElevationProvider;
use crate::{Error, model::Coordinate};

pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/elevation";

/// Points per request accepted by the API
const MAX_BATCH: usize = 100;

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    elevation: Option<Vec<Option<f64>>>,
}

pub struct OpenMeteoElevation {
    client: reqwest::blocking::Client,
    base_url: String,
    batch_size: usize,
}

impl OpenMeteoElevation {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fellroute/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("elevation client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            batch_size: MAX_BATCH,
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH);
        self
    }

    fn batch_url(&self, coords: &[Coordinate]) -> String {
        let latitudes = coords.iter().map(|c| format!("{:.6}", c.lat)).join(",");
        let longitudes = coords.iter().map(|c| format!("{:.6}", c.lon)).join(",");
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}latitude={latitudes}&longitude={longitudes}",
            self.base_url
        )
    }

    fn fetch_batch(&self, coords: &[Coordinate]) -> Result<Vec<Option<f64>>, String> {
        let response = self
            .client
            .get(self.batch_url(coords))
            .send()
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("elevation provider HTTP {status}"));
        }
        let payload: ElevationResponse = response.json().map_err(|e| e.to_string())?;
        let values = payload
            .elevation
            .ok_or_else(|| "elevation provider response has no elevation field".to_string())?;
        if values.len() != coords.len() {
            return Err(format!(
                "elevation provider returned {} values for {} points",
                values.len(),
                coords.len()
            ));
        }
        Ok(values)
    }
}

fn lookup_error(coord: &Coordinate, reason: impl Into<String>) -> Error {
    Error::ElevationLookup {
        lat: coord.lat,
        lon: coord.lon,
        reason: reason.into(),
    }
}

impl ElevationProvider for OpenMeteoElevation {
    fn name(&self) -> &str {
        "open-meteo"
    }

    fn lookup(&self, coord: &Coordinate) -> Result<f64, Error> {
        self.lookup_many(std::slice::from_ref(coord))
            .pop()
            .unwrap_or_else(|| Err(lookup_error(coord, "no result")))
    }

    fn lookup_many(&self, coords: &[Coordinate]) -> Vec<Result<f64, Error>> {
        let mut results = Vec::with_capacity(coords.len());
        for (i, batch) in coords.chunks(self.batch_size).enumerate() {
            debug!("Elevation batch {i}: {} points", batch.len());
            match self.fetch_batch(batch) {
                Ok(values) => {
                    results.extend(batch.iter().zip(values).map(|(coord, value)| {
                        value.ok_or_else(|| lookup_error(coord, "no elevation data"))
                    }));
                }
                Err(reason) => {
                    warn!("Elevation batch {i} failed: {reason}");
                    results.extend(
                        batch
                            .iter()
                            .map(|coord| Err(lookup_error(coord, reason.clone()))),
                    );
                }
            }
        }
        results
    }
}
