//! Elevation profile of a planned route
//!
//! Raw elevation samples along a route are noisy (DEM resolution, flagged
//! nodes), so the profile offers gap interpolation, smoothing and a sanity
//! check before ascent totals are presented to a runner.

use serde::{Deserialize, Serialize};

use super::route::Route;
use crate::{Meters, PLAUSIBLE_ELEVATION_M};

/// Consecutive samples further apart than this count as a suspicious jump
const MAX_PLAUSIBLE_STEP_M: f64 = 500.0;
/// Share of suspicious jumps above which a profile is rejected
const MAX_JUMP_SHARE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    #[default]
    Gaussian,
    Median,
    MovingAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Distance from the route start
    pub distance_m: Meters,
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub elevation_range: f64,
    pub mean_elevation: f64,
    pub valid_points: usize,
    pub total_points: usize,
    /// Share of points that carry an elevation
    pub completeness: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileIssue {
    NoData,
    OutOfRange(ProfileStats),
    ExcessiveJumps { jumps: usize, stats: ProfileStats },
}

impl std::fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileIssue::NoData => write!(f, "no valid elevation data"),
            ProfileIssue::OutOfRange(stats) => write!(
                f,
                "elevations out of plausible range ({:.0} m to {:.0} m)",
                stats.min_elevation, stats.max_elevation
            ),
            ProfileIssue::ExcessiveJumps { jumps, stats } => write!(
                f,
                "{jumps} of {} steps change by more than {MAX_PLAUSIBLE_STEP_M} m",
                stats.total_points
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationProfile {
    pub points: Vec<ProfilePoint>,
}

impl ElevationProfile {
    pub fn from_route(route: &Route) -> Self {
        let mut points = Vec::new();
        let mut offset = 0.0;
        for (leg_idx, leg) in route.legs.iter().enumerate() {
            let skip = usize::from(leg_idx > 0);
            for (coord, along) in leg
                .coordinates
                .iter()
                .zip(&leg.cumulative_m)
                .skip(skip)
            {
                points.push(ProfilePoint {
                    distance_m: offset + along,
                    elevation: coord.elevation,
                });
            }
            offset += leg.distance_m;
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn stats(&self) -> Option<ProfileStats> {
        let valid: Vec<f64> = self.points.iter().filter_map(|p| p.elevation).collect();
        if valid.is_empty() {
            return None;
        }
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let completeness = valid.len() as f64 / self.points.len() as f64;
        Some(ProfileStats {
            min_elevation: min,
            max_elevation: max,
            elevation_range: max - min,
            mean_elevation: mean,
            valid_points: valid.len(),
            total_points: self.points.len(),
            completeness,
        })
    }

    /// Rejects profiles with implausible values or too many abrupt steps
    pub fn validate(&self) -> Result<ProfileStats, ProfileIssue> {
        let stats = self.stats().ok_or(ProfileIssue::NoData)?;
        if !PLAUSIBLE_ELEVATION_M.contains(&stats.min_elevation)
            || !PLAUSIBLE_ELEVATION_M.contains(&stats.max_elevation)
        {
            return Err(ProfileIssue::OutOfRange(stats));
        }

        let jumps = self
            .points
            .windows(2)
            .filter(|pair| match (pair[0].elevation, pair[1].elevation) {
                (Some(a), Some(b)) => (b - a).abs() > MAX_PLAUSIBLE_STEP_M,
                _ => false,
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let too_many = jumps as f64 > self.points.len() as f64 * MAX_JUMP_SHARE;
        if too_many {
            return Err(ProfileIssue::ExcessiveJumps { jumps, stats });
        }
        Ok(stats)
    }

    /// Elevations with gaps filled by linear interpolation along distance
    ///
    /// Leading and trailing gaps take the nearest known value; a profile
    /// without any elevation becomes all zeros.
    pub fn interpolated(&self) -> Vec<f64> {
        let known: Vec<(f64, f64)> = self
            .points
            .iter()
            .filter_map(|p| p.elevation.map(|e| (p.distance_m, e)))
            .collect();
        let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
            return vec![0.0; self.points.len()];
        };

        let mut next = 0;
        self.points
            .iter()
            .map(|p| {
                if let Some(e) = p.elevation {
                    return e;
                }
                if p.distance_m <= first.0 {
                    return first.1;
                }
                if p.distance_m >= last.0 {
                    return last.1;
                }
                while next + 1 < known.len() && known[next + 1].0 < p.distance_m {
                    next += 1;
                }
                let (d0, e0) = known[next];
                let (d1, e1) = known[(next + 1).min(known.len() - 1)];
                if (d1 - d0).abs() < f64::EPSILON {
                    e0
                } else {
                    e0 + (e1 - e0) * (p.distance_m - d0) / (d1 - d0)
                }
            })
            .collect()
    }

    /// Interpolated elevations passed through the chosen filter
    pub fn smoothed(&self, method: SmoothingMethod, sigma: f64) -> Vec<f64> {
        let values = self.interpolated();
        if values.len() < 3 || sigma <= 0.0 {
            return values;
        }
        match method {
            SmoothingMethod::Gaussian => gaussian_filter(&values, sigma),
            SmoothingMethod::Median => median_filter(&values, window_size(sigma)),
            SmoothingMethod::MovingAverage => moving_average(&values, window_size(sigma)),
        }
    }

    /// Total ascent and descent of the smoothed profile
    pub fn smoothed_ascent_descent(&self, method: SmoothingMethod, sigma: f64) -> (Meters, Meters) {
        ascent_descent(&self.smoothed(method, sigma))
    }
}

pub fn ascent_descent(values: &[f64]) -> (Meters, Meters) {
    values
        .windows(2)
        .fold((0.0, 0.0), |(up, down), pair| {
            let delta = pair[1] - pair[0];
            (up + delta.max(0.0), down + (-delta).max(0.0))
        })
}

/// Odd window derived from sigma, at least 3
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn window_size(sigma: f64) -> usize {
    let size = ((sigma * 2.0) as usize + 1).max(3);
    if size % 2 == 0 { size + 1 } else { size }
}

/// Index into `values` mirrored at the edges (a b c | c b a)
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn reflect(idx: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut i = idx.rem_euclid(period);
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn gaussian_filter(values: &[f64], sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    (0..values.len() as isize)
        .map(|i| {
            (-radius..=radius)
                .zip(&weights)
                .map(|(offset, w)| w * values[reflect(i + offset, values.len())])
                .sum::<f64>()
                / total
        })
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
fn median_filter(values: &[f64], window: usize) -> Vec<f64> {
    let half = (window / 2) as isize;
    let mut buf = Vec::with_capacity(window);
    (0..values.len() as isize)
        .map(|i| {
            buf.clear();
            buf.extend((-half..=half).map(|o| values[reflect(i + o, values.len())]));
            buf.sort_by(f64::total_cmp);
            buf[buf.len() / 2]
        })
        .collect()
}

/// Centered mean over the samples that fall inside the profile
#[allow(clippy::cast_precision_loss)]
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let slice = &values[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
