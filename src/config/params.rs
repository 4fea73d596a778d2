//! Motor and control-loop parameters (default values)

use embassy_time::Duration;

/// Speed window within which command and measurement count as equal [RPM]
pub const DEFAULT_DEADBAND_RPM: f32 = 20.0;

/// Re-evaluation period of the speed-control state machine outside Idle
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Moment of inertia of the motor plus flywheel [kg·m²]
pub const DEFAULT_INERTIA_KG_M2: f32 = 0.001712;

/// Physical speed envelope enforced by the integrator [RPM]
/// The motor is rated below 2760 RPM; 2500 leaves margin.
pub const DEFAULT_MAX_SPEED_RPM: f32 = 2500.0;

/// Mechanical RPM per Hz of the driver's FGOUT signal
pub const DEFAULT_RPM_PER_HZ: f32 = 15.0;

/// Integration step used when the measured step is zero or negative
pub const DEFAULT_FALLBACK_STEP: Duration = Duration::from_millis(1);

/// Upper bound of the integration step (missed or late torque command)
pub const DEFAULT_MAX_STEP: Duration = Duration::from_secs(1);

/// Time without an FGOUT edge after which the sensor is considered silent
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(1);

/// Queue depths
pub mod queue {
    /// Edge timestamps from the FGOUT interrupt
    pub const EDGE_DEPTH: usize = 4;

    /// Torque and speed commands
    pub const COMMAND_DEPTH: usize = 2;
}
