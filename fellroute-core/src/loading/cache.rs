//! Persistent path network cache keyed by bounding region

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::provider::NetworkProvider;
use crate::{
    Error,
    model::{BoundingRegion, PathGraph},
};

/// Format version of serialized cache entries; bump when the layout changes
pub const CACHE_VERSION: u32 = 1;

const FILE_PREFIX: &str = "graph_";
const FILE_SUFFIX: &str = ".json";

/// A cached path network together with the region it covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    pub region: BoundingRegion,
    pub created_at: DateTime<Utc>,
    pub graph: PathGraph,
}

impl CacheEntry {
    pub fn new(region: BoundingRegion, graph: PathGraph) -> Self {
        Self {
            version: CACHE_VERSION,
            region,
            created_at: Utc::now(),
            graph,
        }
    }

    pub fn key(&self) -> String {
        self.region.cache_key()
    }

    pub fn meta(&self) -> CacheMeta {
        CacheMeta {
            key: self.key(),
            region: self.region,
            created_at: self.created_at,
        }
    }
}

/// What a store knows about an entry without loading its graph
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMeta {
    pub key: String,
    pub region: BoundingRegion,
    pub created_at: DateTime<Utc>,
}

impl CacheMeta {
    pub fn is_fresh(&self, max_age_days: u32, now: DateTime<Utc>) -> bool {
        now - self.created_at <= Duration::days(i64::from(max_age_days))
    }
}

/// Key-value persistence of cache entries, keyed by [`BoundingRegion::cache_key`]
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, Error>;

    fn store(&self, entry: &CacheEntry) -> Result<(), Error>;

    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Metadata of every stored entry
    fn regions(&self) -> Result<Vec<CacheMeta>, Error>;
}

/// Stores each entry as `graph_<key>.json` in a directory
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{key}{FILE_SUFFIX}"))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        if entry.version != CACHE_VERSION {
            warn!(
                "Ignoring cache file {} with version {} (expected {CACHE_VERSION})",
                path.display(),
                entry.version
            );
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn store(&self, entry: &CacheEntry) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&entry.key());
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, entry)?;
            file.flush()?;
        }
        fs::rename(&tmp, &path)?;
        debug!("Wrote cache file {}", path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn regions(&self) -> Result<Vec<CacheMeta>, Error> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut metas = Vec::new();
        for dir_entry in dir {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let Some(key) = file_name
                .to_str()
                .and_then(|name| name.strip_prefix(FILE_PREFIX))
                .and_then(|name| name.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            let Some(region) = BoundingRegion::from_cache_key(key) else {
                debug!("Skipping unrecognised cache file {key}");
                continue;
            };
            // File age stands in for entry age so the graph need not be parsed
            let modified = dir_entry.metadata()?.modified()?;
            metas.push(CacheMeta {
                key: key.to_owned(),
                region,
                created_at: DateTime::<Utc>::from(modified),
            });
        }
        Ok(metas)
    }
}

/// In-process store, shared by every planner holding it
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn store(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.entries.insert(entry.key(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }

    fn regions(&self) -> Result<Vec<CacheMeta>, Error> {
        Ok(self.entries.iter().map(|entry| entry.meta()).collect())
    }
}

/// Cache-fronted access to a network provider
///
/// Reads of populated entries take no lock. Populating a region is
/// serialized per region key, and the store is consulted again once the
/// lock is held so concurrent sessions fetch a region only once.
pub struct NetworkCache {
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn NetworkProvider>,
    region_locks: DashMap<String, Arc<Mutex<()>>>,
    retention_days: u32,
}

/// Days a cached network is kept before a later fetch evicts it
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

impl NetworkCache {
    pub fn new(store: Arc<dyn CacheStore>, provider: Arc<dyn NetworkProvider>) -> Self {
        Self {
            store,
            provider,
            region_locks: DashMap::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    pub fn provider(&self) -> &dyn NetworkProvider {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// Keep cached networks on disk for `days` regardless of the age limit
    /// individual planning calls accept
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn ensure_graph(
        &self,
        region: &BoundingRegion,
        max_age_days: u32,
        force_refresh: bool,
    ) -> Result<PathGraph, Error> {
        let requested_at = Utc::now();
        if !force_refresh && let Some(entry) = self.lookup(region, max_age_days, requested_at) {
            return Ok(entry.graph);
        }

        let key = region.cache_key();
        let lock = self.region_locks.entry(key.clone()).or_default().value().clone();
        let result = {
            let _guard = lock.lock();
            self.populate(region, &key, max_age_days, force_refresh, requested_at)
        };

        // Only the map holds the lock once every waiter is done with it
        drop(lock);
        self.region_locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Fetches and stores `region`, called with the region lock held
    fn populate(
        &self,
        region: &BoundingRegion,
        key: &str,
        max_age_days: u32,
        force_refresh: bool,
        requested_at: DateTime<Utc>,
    ) -> Result<PathGraph, Error> {
        // Another session may have populated the region while we waited
        if let Some(entry) = self.lookup(region, max_age_days, Utc::now())
            && (!force_refresh || entry.created_at >= requested_at)
        {
            debug!("Region {key} was populated by a concurrent session");
            return Ok(entry.graph);
        }

        info!(
            "Fetching path network for region {key} from {}",
            self.provider.name()
        );
        let graph = self.provider.fetch_path_graph(region)?;
        info!(
            "Fetched {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let entry = CacheEntry::new(*region, graph);
        if let Err(e) = self.store.store(&entry) {
            warn!("Failed to cache path network for region {key}: {e}");
        }
        self.evict_expired(key, Utc::now());
        Ok(entry.graph)
    }

    /// Smallest fresh entry covering `region`
    fn lookup(
        &self,
        region: &BoundingRegion,
        max_age_days: u32,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let metas = match self.store.regions() {
            Ok(metas) => metas,
            Err(e) => {
                warn!("Failed to list cached regions: {e}");
                return None;
            }
        };

        let mut candidates: Vec<_> = metas
            .into_iter()
            .filter(|meta| meta.is_fresh(max_age_days, now) && covers_by_key(&meta.region, region))
            .collect();
        candidates.sort_by(|a, b| {
            a.region
                .area_deg2()
                .total_cmp(&b.region.area_deg2())
                .then_with(|| a.key.cmp(&b.key))
        });

        for meta in candidates {
            match self.store.load(&meta.key) {
                Ok(Some(entry)) if entry.region.covers(region) => {
                    debug!("Cache hit for region {} using entry {}", region.cache_key(), meta.key);
                    return Some(entry);
                }
                Ok(_) => {}
                Err(e) => warn!("Ignoring unreadable cache entry {}: {e}", meta.key),
            }
        }
        None
    }

    /// Removes entries older than the retention period, except `keep`
    fn evict_expired(&self, keep: &str, now: DateTime<Utc>) {
        let Ok(metas) = self.store.regions() else {
            return;
        };
        for meta in metas
            .iter()
            .filter(|meta| meta.key != keep && !meta.is_fresh(self.retention_days, now))
        {
            match self.store.remove(&meta.key) {
                Ok(()) => debug!("Evicted expired cache entry {}", meta.key),
                Err(e) => warn!("Failed to evict cache entry {}: {e}", meta.key),
            }
        }
    }
}

/// Coverage test tolerant of the rounding in cache keys
fn covers_by_key(outer: &BoundingRegion, inner: &BoundingRegion) -> bool {
    const KEY_TOLERANCE: f64 = 1e-5;
    outer.expand(KEY_TOLERANCE).covers(inner)
}
