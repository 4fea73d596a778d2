//! Velocity and torque control path for a DRV8308-driven BLDC motor
//!
//! The driver closes the speed loop only while accelerating, so this crate
//! sequences braking and DIR reversal around it. Components:
//!
//! - [`edge`]: FGOUT interrupt body, timestamps each edge
//! - [`speed_estimator`]: edge interval to signed RPM
//! - [`integrator`]: torque command to speed command
//! - [`speed_control`]: acceleration, braking and zero-crossing state machine
//! - [`sync`]: the queue and share used between them
//! - [`pipeline`]: one motor's worth of queues and shares
//!
//! Hardware access goes through the [`motor::MotorDriver`] trait.
#![cfg_attr(not(test), no_std)]

// Must stay first: the log macros are textually scoped.
mod fmt;

pub mod config;
pub mod edge;
pub mod integrator;
pub mod motor;
pub mod pipeline;
pub mod speed_control;
pub mod speed_estimator;
pub mod sync;

pub use config::{ConfigError, ControlConfig};
pub use edge::{capture_edge, EdgeTimestamp};
pub use integrator::{run_setpoint_integrator, Clock, SystemClock, TorqueIntegrator};
pub use motor::{DirectionSense, MotorDriver, Polarity, PolarityCell};
pub use pipeline::Pipeline;
pub use speed_control::{run_speed_control, MotionState, SpeedController};
pub use speed_estimator::{run_speed_estimator, SpeedEstimator};
