//! Geographic primitives: coordinates, waypoints and bounding regions

use geo::{Haversine, Point, algorithm::Distance};
use serde::{Deserialize, Serialize};

use crate::Meters;

/// Latitude/longitude in decimal degrees with an optional elevation in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
        }
    }

    #[must_use]
    pub fn with_elevation(self, elevation: f64) -> Self {
        Self {
            elevation: Some(elevation),
            ..self
        }
    }

    /// `geo` point in (x = lon, y = lat) order
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    pub fn from_point(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }

    /// Great-circle distance in meters, ignoring elevation
    pub fn distance_m(&self, other: &Coordinate) -> Meters {
        Haversine.distance(self.point(), other.point())
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Category of an input waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Summit,
    #[default]
    PointOfInterest,
}

impl WaypointKind {
    /// Derive the category from a GPX-style waypoint symbol
    pub fn from_symbol(symbol: Option<&str>) -> Self {
        match symbol {
            Some(sym) if sym.trim().eq_ignore_ascii_case("summit") => WaypointKind::Summit,
            _ => WaypointKind::PointOfInterest,
        }
    }
}

/// Caller supplied waypoint, never mutated by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub kind: WaypointKind,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, kind: WaypointKind) -> Self {
        Self {
            name: name.into(),
            coordinate: Coordinate::new(lat, lon),
            kind,
        }
    }

    pub fn summit(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(name, lat, lon, WaypointKind::Summit)
    }
}

/// Rectangular envelope used to scope network and elevation queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingRegion {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Envelope of `coords` expanded by `buffer_deg` on every side
    pub fn around<'a>(
        coords: impl IntoIterator<Item = &'a Coordinate>,
        buffer_deg: f64,
    ) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut region = Self::new(first.lat, first.lon, first.lat, first.lon);
        for coord in iter {
            region.south = region.south.min(coord.lat);
            region.north = region.north.max(coord.lat);
            region.west = region.west.min(coord.lon);
            region.east = region.east.max(coord.lon);
        }
        Some(region.expand(buffer_deg))
    }

    #[must_use]
    pub fn expand(&self, buffer_deg: f64) -> Self {
        Self {
            south: (self.south - buffer_deg).max(-90.0),
            west: (self.west - buffer_deg).max(-180.0),
            north: (self.north + buffer_deg).min(90.0),
            east: (self.east + buffer_deg).min(180.0),
        }
    }

    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.south
            && coord.lat <= self.north
            && coord.lon >= self.west
            && coord.lon <= self.east
    }

    /// Whether `other` lies entirely inside this region
    pub fn covers(&self, other: &BoundingRegion) -> bool {
        self.south <= other.south
            && self.west <= other.west
            && self.north >= other.north
            && self.east >= other.east
    }

    pub fn area_deg2(&self) -> f64 {
        (self.north - self.south).max(0.0) * (self.east - self.west).max(0.0)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Stable identity of the region, one per distinct envelope
    pub fn cache_key(&self) -> String {
        format!(
            "{:.5}_{:.5}_{:.5}_{:.5}",
            self.south, self.west, self.north, self.east
        )
    }

    /// Parses a key produced by [`BoundingRegion::cache_key`]
    pub fn from_cache_key(key: &str) -> Option<Self> {
        let mut parts = key.split('_').map(str::parse::<f64>);
        let region = Self::new(
            parts.next()?.ok()?,
            parts.next()?.ok()?,
            parts.next()?.ok()?,
            parts.next()?.ok()?,
        );
        parts.next().is_none().then_some(region)
    }
}
