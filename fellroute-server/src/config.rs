//! Server configuration loaded from a TOML file

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use fellroute_core::{
    ElevationAnnotator, ElevationCache, FileCacheStore, NetworkCache, OpenMeteoElevation,
    OverpassNetwork, PlannerConfig, RoutePlanner,
    elevation::DEFAULT_OPEN_METEO_URL,
    loading::{DEFAULT_RETENTION_DAYS, provider::DEFAULT_OVERPASS_URL},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub planner: PlannerConfig,
    pub providers: ProviderSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Requests running longer than this are answered with 408
    pub request_timeout_s: u64,
    /// Planning requests handled at the same time
    pub max_concurrent_requests: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            request_timeout_s: 300,
            max_concurrent_requests: 4,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub overpass_url: String,
    pub overpass_timeout_s: u64,
    pub elevation_url: String,
    pub elevation_timeout_s: u64,
    pub elevation_batch_size: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.into(),
            overpass_timeout_s: 180,
            elevation_url: DEFAULT_OPEN_METEO_URL.into(),
            elevation_timeout_s: 30,
            elevation_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding cached path networks
    pub network_dir: PathBuf,
    /// File the elevation cache is loaded from and saved to
    pub elevation_file: PathBuf,
    /// Cached networks older than this are removed after each fetch
    pub retention_days: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            network_dir: PathBuf::from(".fellroute/networks"),
            elevation_file: PathBuf::from(".fellroute/elevation.json"),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl AppConfig {
    /// Reads the file at `path`, or returns defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        config.planner.validate()?;
        Ok(config)
    }

    /// Builds the planner with live providers and on-disk caches
    ///
    /// The HTTP clients are blocking, so call this outside of an async context.
    pub fn build_planner(
        &self,
    ) -> Result<(RoutePlanner, Arc<ElevationCache>), fellroute_core::Error> {
        let network = OverpassNetwork::new(
            self.providers.overpass_url.clone(),
            Duration::from_secs(self.providers.overpass_timeout_s),
        )?;
        let elevation = OpenMeteoElevation::new(
            self.providers.elevation_url.clone(),
            Duration::from_secs(self.providers.elevation_timeout_s),
        )?
        .with_batch_size(self.providers.elevation_batch_size);
        let elevation_cache = Arc::new(ElevationCache::load(&self.cache.elevation_file)?);

        let planner = RoutePlanner::new(
            NetworkCache::new(
                Arc::new(FileCacheStore::new(&self.cache.network_dir)),
                Arc::new(network),
            )
            .with_retention_days(self.cache.retention_days),
            ElevationAnnotator::new(Arc::new(elevation), elevation_cache.clone()),
        );
        Ok((planner, elevation_cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_default_independently() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [planner]
            dry_run = true
            gain_penalty = 12.5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.planner.dry_run);
        assert_eq!(config.planner.gain_penalty, 12.5);
        assert_eq!(config.planner.loss_penalty, 2.0);
        assert_eq!(config.providers, ProviderSettings::default());
        assert_eq!(config.cache.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn invalid_planner_section_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fellroute.toml");
        std::fs::write(&path, "[planner]\nmax_points = 1\n").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
