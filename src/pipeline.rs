//! Control-path wiring
//!
//! ```text
//! FGOUT ISR ──> edges ──> speed estimator ──> actual_speed ──┬──> integrator
//!                                                            └──> speed control ──> driver
//! command source ──> torque_cmd ──> integrator ──> speed_cmd ──> speed control
//! command source ─────────────────────────────────> speed_cmd
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::queue::{COMMAND_DEPTH, EDGE_DEPTH};
use crate::edge::EdgeTimestamp;
use crate::motor::{Polarity, PolarityCell};
use crate::speed_control::MotionState;
use crate::sync::{DropOldestQueue, LatestValue};

/// Every queue and share of one motor's control path
///
/// Built in a `static` so the interrupt handler can reach `edges`; tasks get a
/// `&Pipeline` and touch only the members they own or read.
pub struct Pipeline<M: RawMutex> {
    /// FGOUT edge timestamps, written by the interrupt handler only
    pub edges: DropOldestQueue<M, EdgeTimestamp, EDGE_DEPTH>,
    /// Torque commands [N·m] from the command source
    pub torque_cmd: DropOldestQueue<M, f32, COMMAND_DEPTH>,
    /// Speed commands [RPM] from the integrator or the command source
    pub speed_cmd: DropOldestQueue<M, f32, COMMAND_DEPTH>,
    /// Measured speed [RPM], written by the speed estimator only
    pub actual_speed: LatestValue<M, f32>,
    /// Speed-control state, written by the speed-control task only
    pub motion_state: LatestValue<M, MotionState>,
    /// DIR pin mirror, written by the driver adapter only
    pub polarity: PolarityCell,
}

impl<M: RawMutex> Pipeline<M> {
    pub const fn new() -> Self {
        Self {
            edges: DropOldestQueue::new(),
            torque_cmd: DropOldestQueue::new(),
            speed_cmd: DropOldestQueue::new(),
            actual_speed: LatestValue::new(0.0),
            motion_state: LatestValue::new(MotionState::Idle),
            polarity: PolarityCell::new(Polarity::Forward),
        }
    }
}

impl<M: RawMutex> Default for Pipeline<M> {
    fn default() -> Self {
        Self::new()
    }
}
