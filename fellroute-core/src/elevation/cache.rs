//! Coordinate-keyed elevation cache

use std::{fmt, fs, io::Write, path::Path};

use dashmap::DashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{ELEVATION_KEY_PRECISION, Error, model::Coordinate};

/// Coordinate rounded to [`ELEVATION_KEY_PRECISION`] decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElevationKey {
    lat: i64,
    lon: i64,
}

impl ElevationKey {
    fn scale() -> f64 {
        10f64.powi(ELEVATION_KEY_PRECISION)
    }

    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: (lat * Self::scale()).round() as i64,
            lon: (lon * Self::scale()).round() as i64,
        }
    }

    /// Center of the rounding cell
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(
            self.lat as f64 / Self::scale(),
            self.lon as f64 / Self::scale(),
        )
    }
}

impl From<&Coordinate> for ElevationKey {
    fn from(coord: &Coordinate) -> Self {
        Self::new(coord.lat, coord.lon)
    }
}

impl fmt::Display for ElevationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coord = self.coordinate();
        write!(f, "({:.5}, {:.5})", coord.lat, coord.lon)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredElevation {
    lat: f64,
    lon: f64,
    elevation: f64,
}

/// Concurrent in-memory cache of looked-up elevations
#[derive(Debug, Default)]
pub struct ElevationCache {
    values: DashMap<ElevationKey, f64>,
}

impl ElevationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ElevationKey) -> Option<f64> {
        self.values.get(key).map(|value| *value)
    }

    pub fn get_coordinate(&self, coord: &Coordinate) -> Option<f64> {
        self.get(&ElevationKey::from(coord))
    }

    pub fn insert(&self, key: ElevationKey, elevation: f64) {
        self.values.insert(key, elevation);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Loads a cache file; a missing file yields an empty cache
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No elevation cache at {}", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let stored: Vec<StoredElevation> = serde_json::from_slice(&bytes)?;
        let cache = Self::new();
        for item in stored {
            cache.insert(ElevationKey::new(item.lat, item.lon), item.elevation);
        }
        info!(
            "Loaded {} cached elevations from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }

    /// Writes the cache atomically, entries sorted by key
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut entries: Vec<(ElevationKey, f64)> = self
            .values
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        let stored: Vec<StoredElevation> = entries
            .into_iter()
            .map(|(key, elevation)| {
                let coord = key.coordinate();
                StoredElevation {
                    lat: coord.lat,
                    lon: coord.lon,
                    elevation,
                }
            })
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, &stored)?;
            file.flush()?;
        }
        fs::rename(&tmp, path)?;
        debug!("Saved {} elevations to {}", stored.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_coordinates_share_a_key() {
        let a = ElevationKey::new(55.123454, -3.000001);
        let b = ElevationKey::new(55.123449, -3.000004);
        assert_eq!(a, b);
        assert_ne!(a, ElevationKey::new(55.12346, -3.0));
    }

    #[test]
    fn persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elevation.json");

        let cache = ElevationCache::new();
        cache.insert(ElevationKey::new(55.0, -3.0), 312.0);
        cache.insert(ElevationKey::new(-33.9, 151.2), 18.5);
        cache.save(&path).unwrap();

        let loaded = ElevationCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_coordinate(&Coordinate::new(55.0, -3.0)), Some(312.0));
        assert_eq!(
            loaded.get_coordinate(&Coordinate::new(-33.9, 151.2)),
            Some(18.5)
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ElevationCache::load(&dir.path().join("absent.json")).unwrap();
        assert!(cache.is_empty());
    }
}
