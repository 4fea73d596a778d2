//! Speed-control state machine
//!
//! The DRV8308 closes the speed loop only while accelerating. Slowing down is
//! done with the BRAKE pin, and a change of direction has to brake the motor
//! into the deadband around zero before DIR is flipped. The sequencing is
//! split into a pure [`transition`] function and the [`DriverAction`] it
//! requests, so the whole table can be exercised without hardware.
//!
//! ```text
//!            command                 |actual - command| <= deadband
//!   Idle ───────────────> Accelerating ────────────────────────────> Idle
//!     │
//!     │ command (brake)     same sign, in deadband (release)
//!     └──────────────> Decelerating ──────────────────────────────> Idle
//!                           │ sign mismatch, |actual| < deadband
//!                           v
//!               CrossHighToLow / CrossLowToHigh ──(flip DIR)──> Accelerating
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use libm::fabsf;

use crate::config::{
    ConfigError, DEFAULT_DEADBAND_RPM, DEFAULT_MAX_SPEED_RPM, DEFAULT_POLL_INTERVAL,
};
use crate::motor::{sign, MotorDriver, Polarity};
use crate::sync::{DropOldestQueue, LatestValue};

/// Motion state of the speed controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionState {
    /// Stable, waiting for a speed command
    #[default]
    Idle,
    /// Driver closing the loop towards the command
    Accelerating,
    /// Braking towards the command or towards zero
    Decelerating,
    /// Reverse to forward reversal pending
    CrossHighToLow,
    /// Forward to reverse reversal pending
    CrossLowToHigh,
}

impl MotionState {
    /// Numeric state code reported in status frames
    pub fn code(self) -> u8 {
        match self {
            MotionState::Idle => 0,
            MotionState::Accelerating => 1,
            MotionState::Decelerating => 2,
            MotionState::CrossHighToLow => 3,
            MotionState::CrossLowToHigh => 4,
        }
    }

    /// States re-evaluated on the poll interval
    pub fn is_polled(self) -> bool {
        matches!(self, MotionState::Accelerating | MotionState::Decelerating)
    }
}

/// Driver side effect requested by a transition
///
/// Every speed carried here is a magnitude; the direction is only ever changed
/// through [`DriverAction::Reverse`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverAction {
    /// Leave the driver alone
    Hold,
    /// Command the speed
    Drive { rpm: f32 },
    /// Command zero and engage the brake
    Brake,
    /// Release the brake, then command the speed
    Release { rpm: f32 },
    /// Set DIR, release the brake, then command the speed
    Reverse { polarity: Polarity, rpm: f32 },
}

impl DriverAction {
    /// Perform the action on the driver
    pub fn apply<D: MotorDriver + ?Sized>(self, driver: &mut D) {
        match self {
            DriverAction::Hold => {}
            DriverAction::Drive { rpm } => driver.command_speed(rpm),
            DriverAction::Brake => {
                driver.command_speed(0.0);
                driver.brake();
            }
            DriverAction::Release { rpm } => {
                driver.unbrake();
                driver.command_speed(rpm);
            }
            DriverAction::Reverse { polarity, rpm } => {
                driver.set_direction(polarity);
                driver.unbrake();
                driver.command_speed(rpm);
            }
        }
    }
}

/// Result of one evaluation of the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub next: MotionState,
    pub action: DriverAction,
}

impl Transition {
    const fn to(next: MotionState, action: DriverAction) -> Self {
        Self { next, action }
    }

    const fn stay(state: MotionState) -> Self {
        Self::to(state, DriverAction::Hold)
    }
}

/// Evaluate the state machine once
///
/// # Arguments
/// * `state` - Current state
/// * `command` - Latched speed command [RPM]
/// * `actual` - Latest measured speed [RPM]
/// * `polarity` - Current DIR polarity
/// * `deadband` - Speed tolerance [RPM], inclusive for convergence
pub fn transition(
    state: MotionState,
    command: f32,
    actual: f32,
    polarity: Polarity,
    deadband: f32,
) -> Transition {
    let magnitude = fabsf(command);
    let same_sign = sign(command) == sign(actual);

    match state {
        MotionState::Idle => {
            // Speeding up in the current direction is the only case the driver
            // handles on its own; every other change goes through the brake.
            let accelerate = if command > actual {
                same_sign && polarity == Polarity::Forward
            } else if command < actual {
                same_sign && polarity == Polarity::Reverse
            } else {
                // Equal, or a NaN on either side
                return Transition::stay(MotionState::Idle);
            };

            if accelerate {
                Transition::to(
                    MotionState::Accelerating,
                    DriverAction::Drive { rpm: magnitude },
                )
            } else {
                Transition::to(MotionState::Decelerating, DriverAction::Brake)
            }
        }

        MotionState::Accelerating => {
            if fabsf(actual - command) <= deadband {
                Transition::stay(MotionState::Idle)
            } else {
                Transition::stay(MotionState::Accelerating)
            }
        }

        MotionState::Decelerating => {
            if same_sign {
                if fabsf(actual - command) <= deadband {
                    Transition::to(MotionState::Idle, DriverAction::Release { rpm: magnitude })
                } else {
                    Transition::stay(MotionState::Decelerating)
                }
            } else if fabsf(actual) < deadband {
                match polarity {
                    Polarity::Reverse => Transition::stay(MotionState::CrossHighToLow),
                    Polarity::Forward => Transition::stay(MotionState::CrossLowToHigh),
                }
            } else {
                Transition::stay(MotionState::Decelerating)
            }
        }

        MotionState::CrossHighToLow => Transition::to(
            MotionState::Accelerating,
            DriverAction::Reverse {
                polarity: Polarity::Forward,
                rpm: magnitude,
            },
        ),

        MotionState::CrossLowToHigh => Transition::to(
            MotionState::Accelerating,
            DriverAction::Reverse {
                polarity: Polarity::Reverse,
                rpm: magnitude,
            },
        ),
    }
}

/// State machine parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedControlConfig {
    /// Speed tolerance [RPM]
    pub deadband_rpm: f32,
    /// Re-evaluation interval outside Idle
    pub poll_interval: Duration,
    /// Commands are saturated to ±this [RPM]
    pub max_speed_rpm: f32,
}

impl SpeedControlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.deadband_rpm.is_finite() && self.deadband_rpm >= 0.0) {
            return Err(ConfigError::InvalidDeadband);
        }
        if self.poll_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if !(self.max_speed_rpm.is_finite() && self.max_speed_rpm > 0.0) {
            return Err(ConfigError::InvalidSpeedLimit);
        }
        Ok(())
    }
}

impl Default for SpeedControlConfig {
    fn default() -> Self {
        Self {
            deadband_rpm: DEFAULT_DEADBAND_RPM,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_speed_rpm: DEFAULT_MAX_SPEED_RPM,
        }
    }
}

/// State machine instance: current state plus the latched command
pub struct SpeedController {
    state: MotionState,
    command: f32,
    deadband: f32,
    max_speed: f32,
}

impl SpeedController {
    pub fn new(config: &SpeedControlConfig) -> Self {
        Self {
            state: MotionState::Idle,
            command: 0.0,
            deadband: config.deadband_rpm,
            max_speed: config.max_speed_rpm,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Latched speed command [RPM]
    pub fn command(&self) -> f32 {
        self.command
    }

    /// A new command is only taken in Idle
    pub fn is_waiting_for_command(&self) -> bool {
        self.state == MotionState::Idle
    }

    /// Take a new speed command, saturated to the speed limit
    ///
    /// Returns `false` and keeps the previous command if `command` is not
    /// finite.
    pub fn latch_command(&mut self, command: f32) -> bool {
        if !command.is_finite() {
            warn!("Ignoring non-finite speed command");
            return false;
        }
        self.command = command.max(-self.max_speed).min(self.max_speed);
        true
    }

    /// Evaluate once and adopt the next state
    pub fn step(&mut self, actual: f32, polarity: Polarity) -> Transition {
        let t = transition(self.state, self.command, actual, polarity, self.deadband);
        if t.next != self.state {
            info!(
                "Speed control: {} -> {} (command={} actual={})",
                self.state, t.next, self.command, actual
            );
        }
        self.state = t.next;
        t
    }

    /// Evaluate once against the driver's polarity and apply the action
    pub fn drive<D: MotorDriver + ?Sized>(&mut self, actual: f32, driver: &mut D) -> Transition {
        let t = self.step(actual, driver.direction());
        if t.action != DriverAction::Hold {
            debug!("Driver action: {}", t.action);
        }
        t.action.apply(driver);
        t
    }
}

/// Speed-control task body
///
/// Starts in Idle with forward polarity. In Idle it blocks on the command
/// queue; Accelerating and Decelerating are re-evaluated every
/// `poll_interval`; a pending reversal is carried out without waiting.
pub async fn run_speed_control<M: RawMutex, D: MotorDriver, const N: usize>(
    speed_cmd: &DropOldestQueue<M, f32, N>,
    actual_speed: &LatestValue<M, f32>,
    driver: &mut D,
    config: &SpeedControlConfig,
    status: &LatestValue<M, MotionState>,
) -> ! {
    let mut controller = SpeedController::new(config);
    driver.set_direction(Polarity::Forward);
    status.put(controller.state());

    info!(
        "Speed control started: deadband {} RPM, poll {} ms",
        config.deadband_rpm,
        config.poll_interval.as_millis()
    );

    loop {
        let state = controller.state();
        if controller.is_waiting_for_command() {
            let command = speed_cmd.get().await;
            if !controller.latch_command(command) {
                continue;
            }
        } else if state.is_polled() {
            Timer::after(config.poll_interval).await;
        }

        controller.drive(actual_speed.get(), driver);
        status.put(controller.state());
    }
}
