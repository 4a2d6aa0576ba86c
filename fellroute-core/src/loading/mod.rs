//! This module is responsible for getting a path network for a planning
//! session: from a live provider, from the synthetic fixture, or from cache.

mod cache;
mod config;
pub mod provider;

pub use cache::{
    CACHE_VERSION, CacheEntry, CacheMeta, CacheStore, DEFAULT_RETENTION_DAYS, FileCacheStore,
    MemoryCacheStore, NetworkCache,
};
pub use config::{PlannerConfig, SnapPolicy};
pub use provider::{NetworkProvider, NetworkSource, OverpassNetwork, SyntheticNetwork};
