/// Track Reducer - fold an ordered GPS point stream into fixed-distance segments
///
/// Every point is assigned to the distance bucket its running distance falls in,
/// then each bucket is reduced to mean elevation and summed deltas. Reference
/// tracks additionally carry elapsed time and the observed pace per segment.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::{PacerError, Result};
use crate::geo_metrics::{distance_between, gain, lat_lon};

/// Converts a speed in m/s into a pace in min/km: `pace = PACE_TIME_CONSTANT / speed`.
/// 1000 m/km over 60 s/min is 16.67; the pacing tables use the rounded value.
pub const PACE_TIME_CONSTANT: f64 = 16.7;

pub const DEFAULT_BUCKET_WIDTH_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        RawPoint {
            latitude,
            longitude,
            elevation,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn point(&self) -> Point<f64> {
        lat_lon(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the reduced sequence, always `0..n`.
    pub segment_index: usize,
    /// `floor(cumulative point distance / bucket width)` shared by all points of the segment.
    pub distance_bucket: usize,
    pub point_count: usize,
    pub mean_elevation: f64,
    /// Net elevation change (signed), the regression input.
    pub elevation_delta_sum: f64,
    /// Ascent only.
    pub elevation_gain_sum: f64,
    pub distance_sum: f64,
    pub cumulative_distance: f64,
    pub elapsed_time_sum: Option<f64>,
    pub pace: Option<f64>,
    pub cumulative_elevation_gain: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducerConfig {
    pub bucket_width_m: f64,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        ReducerConfig {
            bucket_width_m: DEFAULT_BUCKET_WIDTH_M,
        }
    }
}

impl ReducerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.bucket_width_m.is_finite() || self.bucket_width_m <= 0.0 {
            return Err(PacerError::InvalidParameter(format!(
                "bucket width must be a positive number of meters, got {}",
                self.bucket_width_m
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackKind {
    Reference,
    Target,
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    point_count: usize,
    elevation_total: f64,
    elevation_delta_sum: f64,
    elevation_gain_sum: f64,
    distance_sum: f64,
    time_sum: f64,
}

/// Per-point deltas against the previous point.
#[derive(Debug, Clone, Copy)]
struct PointDeltas {
    elevation: f64,
    distance: f64,
    time: f64,
}

/// Maps a running distance onto its bucket; anything non-finite lands in bucket 0.
pub fn segment_for_distance(cumulative_distance: f64, bucket_width_m: f64) -> usize {
    if !cumulative_distance.is_finite() || cumulative_distance < 0.0 {
        return 0;
    }
    (cumulative_distance / bucket_width_m).floor() as usize
}

/// Observed pace in min/km, `None` when the segment has no positive time or distance.
///
/// Negative time sums (timestamps out of order) also give `None`, so such segments
/// are never fitted rather than producing a negative pace.
pub fn pace_from(distance_m: f64, time_s: f64) -> Option<f64> {
    if time_s > 0.0 && distance_m > 0.0 {
        Some(PACE_TIME_CONSTANT / (distance_m / time_s))
    } else {
        None
    }
}

/// Reduces a timed reference track. Segments carry elapsed time and observed pace.
pub fn reduce_reference(points: &[RawPoint], config: &ReducerConfig) -> Result<Vec<Segment>> {
    reduce(points, config, TrackKind::Reference)
}

/// Reduces a target track. Timestamps are ignored; segments carry the running
/// elevation total instead of pace.
pub fn reduce_target(points: &[RawPoint], config: &ReducerConfig) -> Result<Vec<Segment>> {
    reduce(points, config, TrackKind::Target)
}

fn reduce(points: &[RawPoint], config: &ReducerConfig, kind: TrackKind) -> Result<Vec<Segment>> {
    config.validate()?;

    let mut buckets: BTreeMap<usize, BucketAccumulator> = BTreeMap::new();
    let mut running_distance = 0.0;

    for (i, point) in points.iter().enumerate() {
        let deltas = if i == 0 {
            PointDeltas {
                elevation: 0.0,
                distance: 0.0,
                time: 0.0,
            }
        } else {
            point_deltas(&points[i - 1], point)
        };

        running_distance += deltas.distance;
        let bucket = segment_for_distance(running_distance, config.bucket_width_m);

        let acc = buckets.entry(bucket).or_default();
        acc.point_count += 1;
        acc.elevation_total += point.elevation;
        acc.elevation_delta_sum += deltas.elevation;
        acc.elevation_gain_sum += gain(deltas.elevation);
        acc.distance_sum += deltas.distance;
        acc.time_sum += deltas.time;
    }

    let mut segments = Vec::with_capacity(buckets.len());
    let mut cumulative_distance = 0.0;
    let mut cumulative_elevation = 0.0;
    let mut untimed = 0;

    for (segment_index, (distance_bucket, acc)) in buckets.into_iter().enumerate() {
        cumulative_distance += acc.distance_sum;
        cumulative_elevation += acc.elevation_delta_sum;

        let (elapsed_time_sum, pace, cumulative_elevation_gain) = match kind {
            TrackKind::Reference => {
                let pace = pace_from(acc.distance_sum, acc.time_sum);
                if pace.is_none() {
                    untimed += 1;
                }
                (Some(acc.time_sum), pace, None)
            }
            TrackKind::Target => (None, None, Some(cumulative_elevation)),
        };

        segments.push(Segment {
            segment_index,
            distance_bucket,
            point_count: acc.point_count,
            mean_elevation: acc.elevation_total / acc.point_count as f64,
            elevation_delta_sum: acc.elevation_delta_sum,
            elevation_gain_sum: acc.elevation_gain_sum,
            distance_sum: acc.distance_sum,
            cumulative_distance,
            elapsed_time_sum,
            pace,
            cumulative_elevation_gain,
        });
    }

    log::debug!(
        "reduced {} points into {} segments ({:.0} m)",
        points.len(),
        segments.len(),
        cumulative_distance
    );
    if untimed > 0 {
        log::warn!(
            "{} reference segments have no usable elapsed time and carry no pace",
            untimed
        );
    }

    Ok(segments)
}

fn point_deltas(prev: &RawPoint, curr: &RawPoint) -> PointDeltas {
    let time = match (prev.timestamp, curr.timestamp) {
        (Some(t0), Some(t1)) => {
            let elapsed = t1 - t0;
            elapsed
                .num_nanoseconds()
                .map(|ns| ns as f64 / 1e9)
                .unwrap_or_else(|| elapsed.num_seconds() as f64)
        }
        _ => 0.0,
    };

    PointDeltas {
        elevation: curr.elevation - prev.elevation,
        distance: distance_between(&prev.point(), &curr.point()),
        time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// One degree of latitude on the pacing sphere, in meters.
    const METERS_PER_DEG: f64 = std::f64::consts::PI * 6_371_000.0 / 180.0;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 8, 0, 0).unwrap()
    }

    /// Walks due north from (46.0, 8.0), `step_m` per point.
    fn north_track(n: usize, step_m: f64, elevation: impl Fn(usize) -> f64) -> Vec<RawPoint> {
        (0..n)
            .map(|i| RawPoint::new(46.0 + (i as f64 * step_m) / METERS_PER_DEG, 8.0, elevation(i)))
            .collect()
    }

    #[test]
    fn empty_track_reduces_to_nothing() {
        let segments = reduce_target(&[], &ReducerConfig::default()).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn single_point_gives_one_zero_segment() {
        let points = vec![RawPoint::new(46.0, 8.0, 512.0).with_timestamp(start())];
        let segments = reduce_reference(&points, &ReducerConfig::default()).unwrap();

        assert_eq!(segments.len(), 1);
        let s = &segments[0];
        assert_eq!(s.segment_index, 0);
        assert_eq!(s.mean_elevation, 512.0);
        assert_eq!(s.elevation_delta_sum, 0.0);
        assert_eq!(s.distance_sum, 0.0);
        assert_eq!(s.elapsed_time_sum, Some(0.0));
        assert_eq!(s.pace, None);
    }

    #[test]
    fn segment_indices_are_contiguous_and_distance_monotonic() {
        let points = north_track(101, 10.0, |i| (i as f64 * 0.3).sin() * 20.0);
        let segments = reduce_target(&points, &ReducerConfig::default()).unwrap();

        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s.segment_index, i);
        }
        for w in segments.windows(2) {
            assert!(w[1].cumulative_distance >= w[0].cumulative_distance);
        }
        let total: f64 = segments.iter().map(|s| s.distance_sum).sum();
        assert!((total - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn sparse_points_keep_indices_contiguous() {
        // 250 m between points skips buckets 1, 3, 4...
        let points = north_track(4, 250.0, |_| 100.0);
        let segments = reduce_target(&points, &ReducerConfig::default()).unwrap();

        let indices: Vec<usize> = segments.iter().map(|s| s.segment_index).collect();
        assert_eq!(indices, (0..segments.len()).collect::<Vec<_>>());
        let buckets: Vec<usize> = segments.iter().map(|s| s.distance_bucket).collect();
        assert_eq!(buckets[0], 0);
        assert!(buckets.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn non_finite_distance_maps_to_first_bucket() {
        assert_eq!(segment_for_distance(f64::NAN, 100.0), 0);
        assert_eq!(segment_for_distance(f64::INFINITY, 100.0), 0);
        assert_eq!(segment_for_distance(99.999, 100.0), 0);
        assert_eq!(segment_for_distance(100.0, 100.0), 1);
        assert_eq!(segment_for_distance(250.0, 50.0), 5);
    }

    #[test]
    fn reference_pace_uses_distance_and_time() {
        // 10 m every 3 s: 3.33 m/s, a touch over 5 min/km
        let points: Vec<RawPoint> = north_track(11, 10.0, |i| 200.0 + i as f64)
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.with_timestamp(start() + Duration::seconds(3 * i as i64)))
            .collect();
        let segments = reduce_reference(&points, &ReducerConfig::default()).unwrap();

        let first = &segments[0];
        let pace = first.pace.unwrap();
        let expected = PACE_TIME_CONSTANT * first.elapsed_time_sum.unwrap() / first.distance_sum;
        assert!((pace - expected).abs() < 1e-9);
        assert!((pace - 5.01).abs() < 0.01);
    }

    #[test]
    fn pace_constant_matches_twelve_km_per_hour() {
        // 12 km/h is 5 min/km; the rounded constant lands within 0.01
        let speed_mps = 12_000.0 / 3600.0;
        let pace = pace_from(speed_mps * 60.0, 60.0).unwrap();
        assert!((pace - 5.0).abs() < 0.011);
    }

    #[test]
    fn zero_time_segment_has_no_pace() {
        let points: Vec<RawPoint> = north_track(5, 10.0, |_| 300.0)
            .into_iter()
            .map(|p| p.with_timestamp(start()))
            .collect();
        let segments = reduce_reference(&points, &ReducerConfig::default()).unwrap();
        assert_eq!(segments[0].elapsed_time_sum, Some(0.0));
        assert_eq!(segments[0].pace, None);
    }

    #[test]
    fn negative_time_deltas_pass_through() {
        let points = vec![
            RawPoint::new(46.0, 8.0, 0.0).with_timestamp(start() + Duration::seconds(10)),
            RawPoint::new(46.0001, 8.0, 0.0).with_timestamp(start()),
        ];
        let segments = reduce_reference(&points, &ReducerConfig::default()).unwrap();
        assert_eq!(segments[0].elapsed_time_sum, Some(-10.0));
        assert_eq!(segments[0].pace, None);
    }

    #[test]
    fn standing_still_has_time_but_no_pace() {
        let points: Vec<RawPoint> = (0..6_i64)
            .map(|i| RawPoint::new(46.0, 8.0, 300.0).with_timestamp(start() + Duration::seconds(20 * i)))
            .collect();
        let segments = reduce_reference(&points, &ReducerConfig::default()).unwrap();

        assert_eq!(segments.len(), 1);
        let stop = &segments[0];
        assert_eq!(stop.distance_sum, 0.0);
        assert_eq!(stop.elapsed_time_sum, Some(100.0));
        assert_eq!(stop.pace, None);

        let mut reference: Vec<Segment> = [-12.0, -6.0, 0.0, 4.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, &delta)| Segment {
                segment_index: i,
                distance_bucket: i,
                elevation_delta_sum: delta,
                distance_sum: 100.0,
                pace: Some(6.0 + 0.1 * delta),
                ..stop.clone()
            })
            .collect();
        reference.push(stop.clone());

        let (_, report) =
            crate::model_fitter::fit_with_report(&reference, &crate::model_fitter::FitConfig::default())
                .unwrap();
        assert_eq!(report.total_segments, 6);
        assert_eq!(report.without_pace, 1);
        assert_eq!(report.qualifying(), 5);
    }

    #[test]
    fn points_measure_through_geo() {
        let a = RawPoint::new(47.0, 8.0, 0.0);
        let b = RawPoint::new(47.01, 8.02, 0.0);
        assert_eq!(a.point().x(), 8.0);
        assert_eq!(a.point().y(), 47.0);
        let d = point_deltas(&a, &b).distance;
        assert_eq!(d, crate::geo_metrics::distance(47.0, 8.0, 47.01, 8.02));
    }

    #[test]
    fn elevation_sums_and_running_total() {
        // up 5 m per point over 30 points of 10 m, then down 2 m per point
        let points = north_track(61, 10.0, |i| {
            if i <= 30 {
                i as f64 * 5.0
            } else {
                150.0 - (i as f64 - 30.0) * 2.0
            }
        });
        let segments = reduce_target(&points, &ReducerConfig::default()).unwrap();

        let net: f64 = segments.iter().map(|s| s.elevation_delta_sum).sum();
        assert!((net - 90.0).abs() < 1e-9);
        let ascent: f64 = segments.iter().map(|s| s.elevation_gain_sum).sum();
        assert!((ascent - 150.0).abs() < 1e-9);

        let last = segments.last().unwrap();
        assert!((last.cumulative_elevation_gain.unwrap() - 90.0).abs() < 1e-9);
        assert!(segments.iter().all(|s| s.pace.is_none()));
    }

    #[test]
    fn denser_sampling_converges_on_segment_distances() {
        let coarse = north_track(51, 20.0, |_| 0.0);
        let fine = north_track(101, 10.0, |_| 0.0);
        let a = reduce_target(&coarse, &ReducerConfig::default()).unwrap();
        let b = reduce_target(&fine, &ReducerConfig::default()).unwrap();

        let total_a = a.last().unwrap().cumulative_distance;
        let total_b = b.last().unwrap().cumulative_distance;
        assert!((total_a - total_b).abs() < 1e-3);
        for (sa, sb) in a.iter().zip(b.iter()) {
            // at most one coarse step apart
            assert!((sa.cumulative_distance - sb.cumulative_distance).abs() <= 20.0 + 1e-3);
        }
    }

    #[test]
    fn bucket_width_is_configurable() {
        let points = north_track(101, 10.0, |_| 0.0);
        let wide = reduce_target(&points, &ReducerConfig { bucket_width_m: 250.0 }).unwrap();
        let narrow = reduce_target(&points, &ReducerConfig::default()).unwrap();
        assert!(wide.len() < narrow.len());

        let bad = reduce_target(&points, &ReducerConfig { bucket_width_m: 0.0 });
        assert!(matches!(bad, Err(PacerError::InvalidParameter(_))));
    }
}
