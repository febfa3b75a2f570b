//! Decode/encode timing captured per factory call.

use std::time::Duration;

/// Sentinel for a timing that was never recorded.
pub const UNSET: i64 = -1;

/// Passive timing accumulator.
///
/// Both fields stay at [`UNSET`] until the corresponding phase runs. Each
/// instance is written by one operation at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetrics {
    /// Nanoseconds spent decoding, or `-1`.
    pub decode_time_nanos: i64,
    /// Nanoseconds spent encoding to DDS, or `-1`.
    pub encode_time_nanos: i64,
}

impl Default for ImageMetrics {
    fn default() -> Self {
        Self {
            decode_time_nanos: UNSET,
            encode_time_nanos: UNSET,
        }
    }
}

impl ImageMetrics {
    /// Create metrics with both timings unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the decode phase.
    pub fn record_decode(&mut self, elapsed: Duration) {
        self.decode_time_nanos = saturating_nanos(elapsed);
    }

    /// Record the encode phase.
    pub fn record_encode(&mut self, elapsed: Duration) {
        self.encode_time_nanos = saturating_nanos(elapsed);
    }

    /// Decode time, if recorded.
    pub fn decode_time(&self) -> Option<Duration> {
        to_duration(self.decode_time_nanos)
    }

    /// Encode time, if recorded.
    pub fn encode_time(&self) -> Option<Duration> {
        to_duration(self.encode_time_nanos)
    }
}

fn saturating_nanos(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX)
}

fn to_duration(nanos: i64) -> Option<Duration> {
    (nanos >= 0).then(|| Duration::from_nanos(nanos as u64))
}
