//! Moving distance and speed over a track's timestamped points.
//!
//! Points are re-sorted by time, then each consecutive pair is counted only if
//! it moved at least `min_movement_km` within a positive gap no longer than
//! `max_gap_s`. Stationary dwell, GPS jitter and recording dropouts therefore
//! contribute neither distance nor time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, KM_TO_MILES, KM_TO_NAUTICAL_MILES};
use crate::{Params, Point};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedStats {
    pub total_distance_km: f64,
    pub moving_time_s: f64,
    pub avg_speed_kmh: f64,
    /// Points that carried a usable timestamp.
    pub timed_points: usize,
    /// Consecutive pairs that passed the movement thresholds.
    pub qualifying_pairs: usize,
}

impl SpeedStats {
    pub fn distance_miles(&self) -> f64 {
        self.total_distance_km * KM_TO_MILES
    }

    pub fn distance_nautical_miles(&self) -> f64 {
        self.total_distance_km * KM_TO_NAUTICAL_MILES
    }

    pub fn moving_time_hours(&self) -> f64 {
        self.moving_time_s / 3600.0
    }

    pub fn avg_speed_mph(&self) -> f64 {
        self.avg_speed_kmh * KM_TO_MILES
    }

    pub fn avg_speed_knots(&self) -> f64 {
        self.avg_speed_kmh * KM_TO_NAUTICAL_MILES
    }
}

#[derive(Default)]
struct MovementAcc {
    distance_km: f64,
    moving_s: f64,
    pairs: usize,
}

/// Compute moving statistics for points given in any order.
///
/// Points without a timestamp are ignored. Fewer than two timestamped points
/// yields all-zero distance, time and speed.
pub fn moving_stats<'a, I>(points: I, params: &Params) -> SpeedStats
where
    I: IntoIterator<Item = &'a Point>,
{
    let mut timed: Vec<(DateTime<Utc>, Coordinate)> = points
        .into_iter()
        .filter_map(|p| p.time.map(|t| (t, p.coordinate)))
        .collect();
    let timed_points = timed.len();
    if timed_points < 2 {
        return SpeedStats {
            timed_points,
            ..SpeedStats::default()
        };
    }

    // Stable: equal timestamps keep file order.
    timed.sort_by_key(|(t, _)| *t);

    let acc = timed
        .windows(2)
        .fold(MovementAcc::default(), |mut acc, pair| {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            let distance = c0.distance_km(&c1);
            let dt = (t1 - t0).num_milliseconds() as f64 / 1000.0;
            if distance >= params.min_movement_km && dt > 0.0 && dt <= params.max_gap_s {
                acc.distance_km += distance;
                acc.moving_s += dt;
                acc.pairs += 1;
            }
            acc
        });

    let avg_speed_kmh = if acc.moving_s > 0.0 {
        acc.distance_km / acc.moving_s * 3600.0
    } else {
        0.0
    };

    SpeedStats {
        total_distance_km: acc.distance_km,
        moving_time_s: acc.moving_s,
        avg_speed_kmh,
        timed_points,
        qualifying_pairs: acc.pairs,
    }
}
