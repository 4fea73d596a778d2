//! FGOUT edge capture
//!
//! The interrupt handler on the driver's FGOUT pin does nothing but read the
//! monotonic clock and hand the timestamp to the speed estimator.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;

use crate::sync::DropOldestQueue;

/// Microsecond timestamp of an FGOUT edge, wrapping at 2^32 µs (~71.6 min)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeTimestamp(u32);

impl EdgeTimestamp {
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    /// Truncate a monotonic instant to the wrapping microsecond counter
    pub fn from_instant(instant: Instant) -> Self {
        Self(instant.as_micros() as u32)
    }

    /// Current monotonic time
    #[inline]
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }

    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Microseconds elapsed since `earlier`, modulo the counter width
    pub const fn wrapping_micros_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Interrupt-handler body: timestamp the edge and enqueue it
///
/// Never blocks or allocates; if the estimator has fallen behind, the oldest
/// pending timestamp is dropped.
#[inline]
pub fn capture_edge<M: RawMutex, const N: usize>(edges: &DropOldestQueue<M, EdgeTimestamp, N>) {
    capture_edge_at(edges, EdgeTimestamp::now());
}

/// Same as [`capture_edge`] with an externally read timestamp
#[inline]
pub fn capture_edge_at<M: RawMutex, const N: usize>(
    edges: &DropOldestQueue<M, EdgeTimestamp, N>,
    timestamp: EdgeTimestamp,
) {
    edges.put(timestamp);
}
