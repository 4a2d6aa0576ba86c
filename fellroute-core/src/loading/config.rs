use serde::{Deserialize, Serialize};

use super::provider::NetworkSource;
use crate::{Error, Meters, routing::CostModel};

/// What to do with a waypoint that is too far from any path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapPolicy {
    /// Abort planning on the first waypoint that cannot be snapped
    #[default]
    FailFast,
    /// Leave unsnappable waypoints out and record them on the route
    SkipUnsnappable,
}

/// Parameters of a planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Buffer in degrees added around the waypoint envelope
    pub buffer_degrees: f64,
    /// Maximum number of waypoints allowed
    pub max_points: usize,
    /// Maximum great-circle distance between consecutive waypoints
    pub max_distance_km: f64,
    /// Maximum distance between a waypoint and its snapped node
    pub snap_threshold_m: Meters,
    /// Cached networks older than this are fetched again
    pub max_cache_age_days: u32,
    /// Fetch a fresh network even if the cache holds a valid one
    pub force_refresh: bool,
    /// Plan on the synthetic network without touching the cache or the network
    pub dry_run: bool,
    /// Horizontal meters charged per meter climbed
    pub gain_penalty: f64,
    /// Horizontal meters charged per meter descended
    pub loss_penalty: f64,
    pub snap_policy: SnapPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            buffer_degrees: 0.01,
            max_points: 50,
            max_distance_km: 20.0,
            snap_threshold_m: 5.0,
            max_cache_age_days: 7,
            force_refresh: false,
            dry_run: false,
            gain_penalty: 10.0,
            loss_penalty: 2.0,
            snap_policy: SnapPolicy::FailFast,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.buffer_degrees.is_finite() || self.buffer_degrees < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "buffer_degrees must be a non-negative number, got {}",
                self.buffer_degrees
            )));
        }
        if self.max_points < 2 {
            return Err(Error::InvalidConfig(format!(
                "max_points must be at least 2, got {}",
                self.max_points
            )));
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_distance_km must be positive, got {}",
                self.max_distance_km
            )));
        }
        if !self.snap_threshold_m.is_finite() || self.snap_threshold_m <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "snap_threshold_m must be positive, got {}",
                self.snap_threshold_m
            )));
        }
        for (name, value) in [
            ("gain_penalty", self.gain_penalty),
            ("loss_penalty", self.loss_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn network_source(&self) -> NetworkSource {
        if self.dry_run {
            NetworkSource::Synthetic
        } else {
            NetworkSource::Live
        }
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.gain_penalty, self.loss_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network_source(), NetworkSource::Live);
    }

    #[test]
    fn rejects_negative_penalty() {
        let config = PlannerConfig {
            loss_penalty: -1.0,
            ..PlannerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig(msg)) if msg.contains("loss_penalty")
        ));
    }

    #[test]
    fn rejects_zero_snap_threshold() {
        let config = PlannerConfig {
            snap_threshold_m: 0.0,
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{"dry_run": true, "snap_policy": "skip_unsnappable"}"#;
        let config: PlannerConfig = serde_json::from_str(json).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.snap_policy, SnapPolicy::SkipUnsnappable);
        assert_eq!(config.max_points, 50);
        assert_eq!(config.network_source(), NetworkSource::Synthetic);
    }
}
