//! Sensor driver line parser (C2).
//!
//! The driver emits plain text lines over stdout. A data line looks like
//! `theta: 123.45 Dist: 678 Q: 15` (the optional leading `S` marks the first
//! line of a new sweep and the optional `Q:` field is ignored). Anything
//! that doesn't match the grammar, and the degenerate `(0, 0)` sample, are
//! not measurements.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Measurement;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(S)?\s*theta:\s*(\d+\.\d+)\s+Dist:\s*(\d+)(?:\.\d+)?(?:\s+Q:\s*\d+)?\s*$")
            .expect("line grammar is a valid regex")
    })
}

/// Parse one sensor driver line into a measurement. Returns `None` for
/// lines that don't match the grammar, and for a matching line whose angle
/// and distance are both zero (noise, not a real reading).
pub fn parse_line(line: &str) -> Option<Measurement> {
    let caps = line_pattern().captures(line)?;
    let theta_deg: f64 = caps.get(2)?.as_str().parse().ok()?;
    let dist_mm: u32 = caps.get(3)?.as_str().parse().ok()?;
    let theta_centi = (theta_deg * 100.0).trunc() as u16;

    if theta_centi == 0 && dist_mm == 0 {
        return None;
    }
    Some(Measurement::new(theta_centi, dist_mm))
}

/// True if this line carries the `S` token that begins a new sweep. This is
/// independent of the measurement grammar entirely — a bare `"S\n"` line
/// with no `theta:`/`Dist:` content is still a boundary — so a driver that
/// ever emits a boundary-only line still closes rotations correctly.
pub fn is_boundary_marker(line: &str) -> bool {
    line.contains('S')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_line() {
        let m = parse_line("theta: 150.25 Dist: 1234").unwrap();
        assert_eq!(m.theta_centi, 15025);
        assert_eq!(m.dist_mm, 1234);
    }

    #[test]
    fn parses_line_with_quality_field() {
        let m = parse_line("theta: 0.50 Dist: 999 Q: 47").unwrap();
        assert_eq!(m.theta_centi, 50);
        assert_eq!(m.dist_mm, 999);
    }

    #[test]
    fn parses_boundary_marked_line_as_a_measurement_too() {
        let m = parse_line("S theta: 0.10 Dist: 500").unwrap();
        assert_eq!(m.theta_centi, 10);
        assert_eq!(m.dist_mm, 500);
    }

    #[test]
    fn detects_boundary_marker() {
        assert!(is_boundary_marker("S theta: 0.10 Dist: 500"));
        assert!(!is_boundary_marker("theta: 0.10 Dist: 500"));
    }

    #[test]
    fn detects_a_bare_boundary_line_with_no_measurement_content() {
        // A driver that emits a boundary on its own line, with nothing
        // matching the measurement grammar, must still close the rotation.
        assert!(is_boundary_marker("S"));
        assert!(is_boundary_marker("S\n"));
        assert!(parse_line("S").is_none());
    }

    #[test]
    fn rejects_all_zero_sample_as_noise() {
        assert!(parse_line("theta: 0.00 Dist: 0").is_none());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("garbage\n").is_none());
        assert!(parse_line("theta: abc Dist: 5").is_none());
        assert!(parse_line("Dist: 500 theta: 1.00").is_none());
    }

    #[test]
    fn truncates_fractional_centidegrees_rather_than_rounds() {
        // 1.239 -> 123 (not 124), matching plain fixed-point truncation.
        let m = parse_line("theta: 1.239 Dist: 1").unwrap();
        assert_eq!(m.theta_centi, 123);
    }
}
