//! Bit-packed rotation codec (C4).
//!
//! Wire format: `payload || timestamp`. `payload` is a bitstream, MSB-first,
//! of one 11-bit unsigned + 16-bit unsigned pair for the first sample,
//! followed by one 11-bit signed + 16-bit signed delta pair per subsequent
//! sample, zero-padded on the right to a byte boundary. `timestamp` is
//! exactly 8 bytes, big-endian microseconds since the Unix epoch.
//!
//! The 11-bit initial theta field is narrower than `theta_centi`'s full
//! `0..=36000` range (11 bits only spans `0..=2047`). This isn't a bug we
//! introduced: it is the field width the wire format actually uses (it is
//! what makes the byte counts in the scenario tests below come out right),
//! and we preserve it rather than widening the field, per the "preserve
//! current behaviour bit-for-bit" guidance for this wire format. A rotation
//! whose first sample's `theta_centi` exceeds 2047 will have that one field
//! silently wrap on encode — this never affects acceptance (the segmenter
//! only constrains coverage and gaps, not the first sample's raw value) and
//! the validator downstream exists precisely to catch the kind of
//! low-magnitude nonsense this and the padding tail can produce.

use crate::error::{DecodeError, EncodeError};
use crate::types::{DecodedFrame, Rotation};

const THETA_INIT_BITS: u32 = 11;
const DIST_INIT_BITS: u32 = 16;
const THETA_DELTA_BITS: u32 = 11;
const DIST_DELTA_BITS: u32 = 16;

/// MSB-first bit-packing writer. Bits are appended one at a time; a
/// trailing partial byte is left-aligned (unused low bits cleared) when
/// the stream is finished, matching the decoder's expectation that pad
/// bits are always zero.
struct BitWriter {
    bytes: Vec<u8>,
    cur: u8,
    nbits: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { bytes: Vec::new(), cur: 0, nbits: 0 }
    }

    fn push_bit(&mut self, bit: u8) {
        self.cur = (self.cur << 1) | (bit & 1);
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes.push(self.cur);
            self.cur = 0;
            self.nbits = 0;
        }
    }

    fn write_raw(&mut self, value: u32, width: u32) {
        for i in (0..width).rev() {
            self.push_bit(((value >> i) & 1) as u8);
        }
    }

    /// Write the low `width` bits of `value`, unsigned, truncating silently
    /// if `value` doesn't fit (matches the original bit-packer, which masks
    /// rather than rejects).
    fn write_unsigned(&mut self, value: u32, width: u32) {
        let mask = if width >= 32 { u32::MAX } else { (1u32 << width) - 1 };
        self.write_raw(value & mask, width);
    }

    /// Write a signed delta as two's complement over exactly `width` bits.
    /// Errors if `value` doesn't fit the signed range — the caller discards
    /// the whole rotation rather than truncate a delta.
    fn write_signed(&mut self, value: i32, width: u32) -> Result<(), EncodeError> {
        let min = -(1i32 << (width - 1));
        let max = (1i32 << (width - 1)) - 1;
        if value < min || value > max {
            return Err(EncodeError::RangeExceeded { value, width });
        }
        let uval = if value < 0 { ((1i64 << width) + value as i64) as u32 } else { value as u32 };
        self.write_raw(uval, width);
        Ok(())
    }

    /// Flush the trailing partial byte (if any) and return the packed bytes.
    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.bytes.push(self.cur);
        }
        self.bytes
    }
}

/// MSB-first bit reader that refills from whole bytes on demand.
struct BitReader<'a> {
    data: &'a [u8],
    byte_idx: usize,
    bit_buffer: u64,
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, byte_idx: 0, bit_buffer: 0, bit_count: 0 }
    }

    fn refill(&mut self) {
        while self.bit_count <= 56 && self.byte_idx < self.data.len() {
            self.bit_buffer = (self.bit_buffer << 8) | self.data[self.byte_idx] as u64;
            self.byte_idx += 1;
            self.bit_count += 8;
        }
    }

    /// True while there is at least one more full sample's worth of data
    /// available — either whole unconsumed bytes, or enough bits already
    /// buffered to start a theta field. This is the decode loop's sole
    /// termination predicate (see module docs / spec §9's open question).
    fn has_more_samples(&self) -> bool {
        self.byte_idx < self.data.len() || self.bit_count >= THETA_DELTA_BITS
    }

    fn read_raw(&mut self, n: u32) -> Option<u32> {
        self.refill();
        if self.bit_count < n {
            return None;
        }
        let shift = self.bit_count - n;
        let mask = (1u64 << n) - 1;
        let value = (self.bit_buffer >> shift) & mask;
        self.bit_count -= n;
        if self.bit_count < 64 {
            self.bit_buffer &= (1u64 << self.bit_count) - 1;
        }
        Some(value as u32)
    }

    fn read_unsigned(&mut self, n: u32) -> Option<u32> {
        self.read_raw(n)
    }

    fn read_signed(&mut self, n: u32) -> Option<i32> {
        let raw = self.read_raw(n)?;
        let sign_bit = 1u32 << (n - 1);
        if raw & sign_bit != 0 {
            Some(raw as i32 - (1i32 << n))
        } else {
            Some(raw as i32)
        }
    }
}

/// Encode an accepted rotation into its wire frame. Fails (discarding the
/// whole rotation, never truncating it) if any inter-sample delta doesn't
/// fit the signed 11-bit theta / 16-bit distance window.
pub fn encode_rotation(rotation: &Rotation) -> Result<Vec<u8>, EncodeError> {
    let mut writer = BitWriter::new();
    let mut prev: Option<(i64, i64)> = None;

    for m in &rotation.measurements {
        let theta = m.theta_centi as i64;
        let dist = m.dist_mm as i64;
        match prev {
            None => {
                writer.write_unsigned(theta as u32, THETA_INIT_BITS);
                writer.write_unsigned(dist as u32, DIST_INIT_BITS);
            }
            Some((pt, pd)) => {
                writer.write_signed((theta - pt) as i32, THETA_DELTA_BITS)?;
                writer.write_signed((dist - pd) as i32, DIST_DELTA_BITS)?;
            }
        }
        prev = Some((theta, dist));
    }

    let mut frame = writer.finish();
    frame.extend_from_slice(&rotation.start_time_us.to_be_bytes());
    Ok(frame)
}

/// Decode a raw frame back into a timestamp and the samples the bitstream
/// actually contains (which may include one spurious pad-derived trailing
/// pair — the validator (C7) is responsible for filtering that out, not
/// this function).
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame, DecodeError> {
    if frame.len() < 8 {
        return Err(DecodeError::FrameTooShort { len: frame.len() });
    }
    let (payload, trailer) = frame.split_at(frame.len() - 8);
    let timestamp_us = u64::from_be_bytes(trailer.try_into().expect("exactly 8 bytes"));

    let mut reader = BitReader::new(payload);
    let mut samples = Vec::new();
    let mut theta_centi: i64 = 0;
    let mut dist_mm: i64 = 0;
    let mut first = true;

    while reader.has_more_samples() {
        if first {
            let theta = reader.read_unsigned(THETA_INIT_BITS).ok_or(DecodeError::UnexpectedEndOfFrame)?;
            let dist = reader.read_unsigned(DIST_INIT_BITS).ok_or(DecodeError::UnexpectedEndOfFrame)?;
            theta_centi = theta as i64;
            dist_mm = dist as i64;
            first = false;
        } else {
            let theta_diff = reader.read_signed(THETA_DELTA_BITS).ok_or(DecodeError::UnexpectedEndOfFrame)?;
            let dist_diff = reader.read_signed(DIST_DELTA_BITS).ok_or(DecodeError::UnexpectedEndOfFrame)?;
            theta_centi += theta_diff as i64;
            dist_mm += dist_diff as i64;
        }
        samples.push((theta_centi as f64 / 100.0, dist_mm));
    }

    Ok(DecodedFrame { timestamp_us, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Measurement;

    fn rotation(pairs: &[(u16, u32)], start_time_us: u64) -> Rotation {
        Rotation {
            measurements: pairs.iter().map(|&(t, d)| Measurement::new(t, d)).collect(),
            start_time_us,
        }
    }

    #[test]
    fn s1_single_sample_is_twelve_bytes() {
        // 27 payload bits (11 + 16) pad to 32 (4 bytes), + 8 timestamp bytes.
        let r = rotation(&[(15000, 1234)], 1_700_000_000_000_000);
        let frame = encode_rotation(&r).unwrap();
        assert_eq!(frame.len(), 12);

        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.timestamp_us, 1_700_000_000_000_000);
        // The 11-bit initial theta field wraps 15000 -> 15000 % 2048 = 664.
        assert_eq!(decoded.samples, vec![(6.64, 1234)]);
    }

    #[test]
    fn s2_two_samples_is_fifteen_bytes() {
        // 54 payload bits (11+16+11+16) pad to 56 (7 bytes), + 8 = 15 bytes.
        let r = rotation(&[(15000, 1234), (15050, 1230)], 42);
        let frame = encode_rotation(&r).unwrap();
        assert_eq!(frame.len(), 15);

        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.timestamp_us, 42);
        assert_eq!(decoded.samples, vec![(6.64, 1234), (7.14, 1230)]);
    }

    #[test]
    fn s3_range_failure_discards_whole_rotation() {
        let r = rotation(&[(0, 0), (2000, 0)], 0);
        let err = encode_rotation(&r).unwrap_err();
        match err {
            EncodeError::RangeExceeded { value, width } => {
                assert_eq!(value, 2000);
                assert_eq!(width, 11);
            }
        }
    }

    #[test]
    fn s5_seven_bytes_is_frame_too_short() {
        let err = decode_frame(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, DecodeError::FrameTooShort { len: 7 }));
    }

    #[test]
    fn s5_eight_zero_bytes_decodes_to_empty_payload() {
        // No payload bytes remain once the 8-byte trailer is removed, and
        // the bit reader starts with zero buffered bits, so the loop
        // terminates immediately: timestamp 0, no samples.
        let decoded = decode_frame(&[0u8; 8]).unwrap();
        assert_eq!(decoded.timestamp_us, 0);
        assert!(decoded.samples.is_empty());
    }

    #[test]
    fn round_trip_within_eleven_bit_initial_range() {
        // Initial theta chosen small enough (< 2048) to round-trip exactly,
        // demonstrating the lossless case the 11-bit field does support.
        let r = rotation(&[(1800, 500), (1850, 480), (1795, 520)], 9);
        let frame = encode_rotation(&r).unwrap();
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.timestamp_us, 9);
        assert_eq!(decoded.samples, vec![(18.00, 500), (18.50, 480), (17.95, 520)]);
    }

    #[test]
    fn negative_deltas_round_trip() {
        let r = rotation(&[(100, 5000), (50, 4000), (0, 14000)], 1);
        let frame = encode_rotation(&r).unwrap();
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.samples, vec![(1.00, 5000), (0.50, 4000), (0.00, 14000)]);
    }

    #[test]
    fn delta_at_exact_signed_boundary_succeeds() {
        let r = rotation(&[(0, 0), (1023, 32767)], 0);
        assert!(encode_rotation(&r).is_ok());
        let r = rotation(&[(2000, 0), (976, 0)], 0); // delta = -1024, boundary
        assert!(encode_rotation(&r).is_ok());
    }

    #[test]
    fn dist_delta_one_past_boundary_fails() {
        let r = rotation(&[(0, 0), (0, 32768)], 0);
        let err = encode_rotation(&r).unwrap_err();
        assert!(matches!(err, EncodeError::RangeExceeded { width: 16, .. }));
    }
}
