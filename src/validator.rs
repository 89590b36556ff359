//! Sample validator (C7): the last line of defense between whatever the
//! decoder produced — including garbage from a corrupt frame or a
//! spurious pad-derived trailing pair — and the monitor subscribers.

use crate::types::DecodedSample;

const THETA_MIN_DEG: f64 = 0.0;
const THETA_MAX_DEG: f64 = 360.0;
const DIST_MIN_MM: i64 = 0;
const DIST_MAX_MM: i64 = 14000;
const MAX_GAP_DEG: f64 = 100.0;

/// Filters a decoded frame's samples in arrival order: drops any sample
/// whose angle or distance is out of range, and any sample whose angle
/// jumped more than 100.00 degrees from the last *accepted* sample. Returns
/// the surviving samples plus how many were dropped.
pub fn filter_samples(samples: Vec<DecodedSample>) -> (Vec<DecodedSample>, usize) {
    let mut kept = Vec::with_capacity(samples.len());
    let mut dropped = 0;
    let mut prev_theta: Option<f64> = None;

    for (theta, dist) in samples {
        let in_range = (THETA_MIN_DEG..=THETA_MAX_DEG).contains(&theta)
            && (DIST_MIN_MM..=DIST_MAX_MM).contains(&dist);
        let gap_ok = match prev_theta {
            Some(prev) => (theta - prev).abs() <= MAX_GAP_DEG,
            None => true,
        };

        if in_range && gap_ok {
            prev_theta = Some(theta);
            kept.push((theta, dist));
        } else {
            dropped += 1;
        }
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_in_range_samples() {
        let (kept, dropped) = filter_samples(vec![(0.0, 0), (180.0, 7000), (360.0, 14000)]);
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn drops_out_of_range_theta() {
        let (kept, dropped) = filter_samples(vec![(-1.0, 100), (361.0, 100)]);
        assert!(kept.is_empty());
        assert_eq!(dropped, 2);
    }

    #[test]
    fn drops_out_of_range_distance() {
        let (kept, dropped) = filter_samples(vec![(10.0, -1), (10.0, 14001)]);
        assert!(kept.is_empty());
        assert_eq!(dropped, 2);
    }

    #[test]
    fn drops_samples_after_a_large_angle_jump() {
        let (kept, dropped) = filter_samples(vec![(10.0, 100), (10.5, 100), (200.0, 100), (201.0, 100)]);
        // 200.0 jumps 189.5 from the last accepted (10.5): dropped.
        // 201.0 is then measured against 10.5 still (last accepted unchanged): dropped too.
        assert_eq!(kept, vec![(10.0, 100), (10.5, 100)]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (kept, dropped) = filter_samples(vec![]);
        assert!(kept.is_empty());
        assert_eq!(dropped, 0);
    }
}
