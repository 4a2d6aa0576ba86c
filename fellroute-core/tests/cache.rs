mod common;

use std::{sync::Arc, thread, time::Duration};

use common::{CountingElevation, CountingNetwork, fell_round};
use fellroute_core::{
    BoundingRegion, CacheEntry, CacheStore, ElevationAnnotator, ElevationCache, FileCacheStore,
    MemoryCacheStore, NetworkCache, PathGraph, PlannerConfig, RoutePlanner,
};

fn region() -> BoundingRegion {
    BoundingRegion::new(54.52, -3.19, 54.58, -3.16)
}

#[test]
fn concurrent_sessions_fetch_once() {
    let network = Arc::new(CountingNetwork {
        delay: Duration::from_millis(100),
        ..CountingNetwork::new()
    });
    let cache = NetworkCache::new(Arc::new(MemoryCacheStore::new()), network.clone());

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let graph = cache.ensure_graph(&region(), 7, false).unwrap();
                assert!(!graph.is_empty());
            });
        }
    });

    assert_eq!(network.calls(), 1);
}

#[test]
fn concurrent_planning_sessions_share_the_cache() {
    let network = Arc::new(CountingNetwork {
        delay: Duration::from_millis(50),
        ..CountingNetwork::new()
    });
    let planner = RoutePlanner::new(
        NetworkCache::new(Arc::new(MemoryCacheStore::new()), network.clone()),
        ElevationAnnotator::new(
            Arc::new(CountingElevation::new()),
            Arc::new(ElevationCache::new()),
        ),
    );
    let config = PlannerConfig {
        snap_threshold_m: 100.0,
        ..PlannerConfig::default()
    };
    let waypoints = fell_round();

    let routes: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let route = planner.plan_route(&waypoints, &config).unwrap();
                    serde_json::to_string(&route).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(network.calls(), 1);
    assert!(routes.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn file_cache_survives_a_new_planner() {
    let dir = tempfile::tempdir().unwrap();
    let network = Arc::new(CountingNetwork::new());

    let first = NetworkCache::new(Arc::new(FileCacheStore::new(dir.path())), network.clone());
    let fetched = first.ensure_graph(&region(), 7, false).unwrap();

    let second = NetworkCache::new(Arc::new(FileCacheStore::new(dir.path())), network.clone());
    let loaded = second.ensure_graph(&region(), 7, false).unwrap();

    assert_eq!(network.calls(), 1);
    assert_eq!(loaded.node_count(), fetched.node_count());
    assert_eq!(loaded.edge_count(), fetched.edge_count());
}

#[test]
fn smaller_region_uses_covering_entry() {
    let network = Arc::new(CountingNetwork::new());
    let cache = NetworkCache::new(Arc::new(MemoryCacheStore::new()), network.clone());

    cache.ensure_graph(&region(), 7, false).unwrap();
    let inner = BoundingRegion::new(54.53, -3.18, 54.57, -3.17);
    cache.ensure_graph(&inner, 7, false).unwrap();
    assert_eq!(network.calls(), 1);

    // Not covered: extends past the cached envelope
    let wider = region().expand(0.01);
    cache.ensure_graph(&wider, 7, false).unwrap();
    assert_eq!(network.calls(), 2);
}

#[test]
fn expired_entry_and_force_refresh() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = Arc::new(CountingNetwork::new());
    let cache = NetworkCache::new(store.clone(), network.clone());

    let mut old = CacheEntry::new(region(), PathGraph::empty());
    old.created_at -= chrono::Duration::days(2);
    store.store(&old).unwrap();

    // Two days old with a one day limit: refetched
    cache.ensure_graph(&region(), 1, false).unwrap();
    assert_eq!(network.calls(), 1);

    // Fresh now, reused
    cache.ensure_graph(&region(), 1, false).unwrap();
    assert_eq!(network.calls(), 1);

    cache.ensure_graph(&region(), 1, true).unwrap();
    assert_eq!(network.calls(), 2);
    assert_eq!(store.len(), 1);
}

#[test]
fn dry_run_leaves_the_cache_untouched() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = Arc::new(CountingNetwork::new());
    let planner = RoutePlanner::new(
        NetworkCache::new(store.clone(), network.clone()),
        ElevationAnnotator::new(
            Arc::new(CountingElevation::new()),
            Arc::new(ElevationCache::new()),
        ),
    );
    let config = PlannerConfig {
        dry_run: true,
        ..PlannerConfig::default()
    };
    planner.plan_route(&fell_round(), &config).unwrap();
    assert_eq!(network.calls(), 0);
    assert!(store.is_empty());
}
