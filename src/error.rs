use std::time::Duration;

/// Why a rotation buffered by the segmenter was rejected before it ever
/// reached the encoder. Not a `std::error::Error` — these are logged and
/// the segmenter moves on, per spec's "drop rotation, log warning, continue"
/// policy for every C3 failure kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Sample count fell outside `[300, 650]`.
    SizeOutOfRange { count: usize },
    /// `min(theta) > 10.00°` or `max(theta) < 350.00°`.
    CoverageFailure { count: usize, min_deg: f64, max_deg: f64 },
    /// Two consecutive sorted angles differed by more than 10.00°.
    AngleGap { count: usize, gap_deg: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::SizeOutOfRange { count } => {
                write!(f, "rotation size {count} outside [300, 650]")
            }
            RejectReason::CoverageFailure { count, min_deg, max_deg } => {
                write!(f, "angle coverage failure on {count} samples: min={min_deg:.2} max={max_deg:.2}")
            }
            RejectReason::AngleGap { count, gap_deg } => {
                write!(f, "angle gap of {gap_deg:.2} degrees between consecutive samples ({count} samples total)")
            }
        }
    }
}

/// Errors from the bit-packed encoder (C4).
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// An inter-sample delta didn't fit the signed 11-bit (theta) or
    /// signed 16-bit (distance) field. The whole rotation is discarded,
    /// never truncated.
    #[error("delta {value} exceeds the signed {width}-bit field")]
    RangeExceeded { value: i32, width: u32 },
}

/// Errors from the bit-packed decoder (C4).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is {len} bytes, need at least 8 for the timestamp trailer")]
    FrameTooShort { len: usize },
    #[error("buffer underflow mid-sample")]
    UnexpectedEndOfFrame,
}

/// Errors from the sensor-side line source (C1).
#[derive(Debug, thiserror::Error)]
pub enum LineSourceError {
    #[error("failed to spawn sensor driver: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("sensor driver exited")]
    DriverExited,
    #[error("error reading sensor driver stdout: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the ingest client's outer reconnect loop (C5).
#[derive(Debug, thiserror::Error)]
pub enum IngestClientError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },
    #[error("transport error connecting to {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),
}

/// Errors from the ingest server's per-connection handler (C6).
#[derive(Debug, thiserror::Error)]
pub enum IngestServerError {
    #[error("recv failed: {0}")]
    Recv(#[source] std::io::Error),
}
