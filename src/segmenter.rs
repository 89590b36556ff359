//! Rotation segmenter (C3): groups a stream of measurements into discrete
//! 360-degree sweeps and decides whether each one is worth encoding.
//!
//! A rotation is accepted only if all three hold:
//!   - sample count is in `[300, 650]`
//!   - angle coverage reaches both ends: `min(theta) <= 10.00` and
//!     `max(theta) >= 350.00`
//!   - no two consecutive samples, sorted by angle, are more than 10.00
//!     degrees apart

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RejectReason;
use crate::types::{Measurement, Rotation};

const MIN_COUNT: usize = 300;
const MAX_COUNT: usize = 650;
const MIN_COVERAGE_START_DEG: f64 = 10.00;
const MAX_COVERAGE_END_DEG: f64 = 350.00;
const MAX_GAP_DEG: f64 = 10.00;

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_micros() as u64
}

/// Accumulates measurements for the rotation currently in progress.
pub struct Segmenter {
    buffer: Vec<Measurement>,
    start_time_us: Option<u64>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self { buffer: Vec::new(), start_time_us: None }
    }

    /// Feed one measurement into the rotation currently being buffered.
    /// Call this for every parsed line that isn't a boundary marker.
    pub fn push(&mut self, m: Measurement) {
        if self.start_time_us.is_none() {
            self.start_time_us = Some(now_us());
        }
        self.buffer.push(m);
    }

    /// Called when the driver signals a new sweep is starting. Evaluates
    /// the buffered rotation for acceptance and clears the buffer either
    /// way, ready for the next sweep.
    pub fn on_boundary(&mut self) -> Result<Rotation, RejectReason> {
        let start_time_us = self.start_time_us.take().unwrap_or_else(now_us);
        let measurements = std::mem::take(&mut self.buffer);
        Self::evaluate(measurements, start_time_us)
    }

    fn evaluate(measurements: Vec<Measurement>, start_time_us: u64) -> Result<Rotation, RejectReason> {
        let count = measurements.len();
        if count < MIN_COUNT || count > MAX_COUNT {
            return Err(RejectReason::SizeOutOfRange { count });
        }

        let mut sorted_degs: Vec<f64> = measurements.iter().map(|m| m.theta_deg()).collect();
        sorted_degs.sort_by(|a, b| a.partial_cmp(b).expect("theta is never NaN"));

        let min_deg = sorted_degs[0];
        let max_deg = *sorted_degs.last().expect("non-empty, checked by count range");
        if min_deg > MIN_COVERAGE_START_DEG || max_deg < MAX_COVERAGE_END_DEG {
            return Err(RejectReason::CoverageFailure { count, min_deg, max_deg });
        }

        for pair in sorted_degs.windows(2) {
            let gap = pair[1] - pair[0];
            if gap > MAX_GAP_DEG {
                return Err(RejectReason::AngleGap { count, gap_deg: gap });
            }
        }

        Ok(Rotation { measurements, start_time_us })
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_rotation(count: usize) -> Vec<Measurement> {
        // `count` samples evenly spread across 0.00..=360.00 degrees, well
        // within the 10-degree gap budget, each with a nonzero distance.
        (0..count)
            .map(|i| {
                let deg = i as f64 * 360.0 / count as f64;
                Measurement::new((deg * 100.0) as u16, 1000)
            })
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_rotation() {
        let rotation = Segmenter::evaluate(dense_rotation(400), 0).unwrap();
        assert_eq!(rotation.measurements.len(), 400);
    }

    #[test]
    fn rejects_too_few_samples() {
        let err = Segmenter::evaluate(dense_rotation(299), 0).unwrap_err();
        assert!(matches!(err, RejectReason::SizeOutOfRange { count: 299 }));
    }

    #[test]
    fn rejects_too_many_samples() {
        let err = Segmenter::evaluate(dense_rotation(651), 0).unwrap_err();
        assert!(matches!(err, RejectReason::SizeOutOfRange { count: 651 }));
    }

    #[test]
    fn rejects_missing_coverage_at_either_end() {
        // All samples clustered between 50 and 300 degrees: misses both ends.
        let measurements: Vec<Measurement> = (0..400)
            .map(|i| {
                let deg = 50.0 + i as f64 * (250.0 / 400.0);
                Measurement::new((deg * 100.0) as u16, 1000)
            })
            .collect();
        let err = Segmenter::evaluate(measurements, 0).unwrap_err();
        assert!(matches!(err, RejectReason::CoverageFailure { .. }));
    }

    #[test]
    fn rejects_a_large_gap_between_consecutive_angles() {
        let mut measurements = dense_rotation(400);
        // Remove a contiguous slice of the sorted mid-range to blow the gap.
        measurements.retain(|m| !(120.0..160.0).contains(&m.theta_deg()));
        let err = Segmenter::evaluate(measurements, 0).unwrap_err();
        assert!(matches!(err, RejectReason::AngleGap { .. }));
    }

    #[test]
    fn push_then_boundary_round_trips_through_the_live_api() {
        let mut seg = Segmenter::new();
        for m in dense_rotation(320) {
            seg.push(m);
        }
        let rotation = seg.on_boundary().unwrap();
        assert_eq!(rotation.measurements.len(), 320);
        // Buffer is cleared and ready for the next sweep.
        assert!(seg.on_boundary().is_err());
    }
}
