/// One `(angle, distance)` reading from the rangefinder.
///
/// `theta_centi` is the angle in hundredths of a degree (`0..=36000`),
/// `dist_mm` is the distance in millimeters (`0..=65535`). A sample with
/// both fields zero is noise and never reaches a `Measurement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub theta_centi: u16,
    pub dist_mm: u32,
}

impl Measurement {
    pub fn new(theta_centi: u16, dist_mm: u32) -> Self {
        Self { theta_centi, dist_mm }
    }

    pub fn theta_deg(&self) -> f64 {
        self.theta_centi as f64 / 100.0
    }
}

/// A complete 360-degree sweep accepted by the segmenter, ready for the
/// encoder. Ownership: the segmenter hands this by value once a rotation
/// is accepted, then clears its own buffer for the next one.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub measurements: Vec<Measurement>,
    /// Microseconds since the Unix epoch, captured when the boundary marker
    /// that *begins* this rotation was observed.
    pub start_time_us: u64,
}

/// One decoded `(theta_deg, dist_mm)` pair produced by the decoder (C4) and
/// consumed by the validator (C7). `dist_mm` is `i64`, not `u32`: garbage
/// deltas (spurious pad-derived pairs, corrupt frames) can walk the running
/// distance negative, and the validator — not the decoder — is what throws
/// those samples away.
pub type DecodedSample = (f64, i64);

/// A fully decoded frame: timestamp plus every sample the bit reader
/// produced (including any spurious pad-derived trailing pair).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub timestamp_us: u64,
    pub samples: Vec<DecodedSample>,
}

/// An encoded frame paired with the sample count that produced it. Not part
/// of the wire format — the bytes sent are exactly `frame`, nothing else —
/// this only exists so the ingest client can log/report what it just sent
/// without re-deriving the count from the byte length.
#[derive(Debug, Clone)]
pub struct RotationPacket {
    pub frame: Vec<u8>,
    pub sample_count: usize,
}
