// Torque-to-speed integrator
// Forward-Euler integration of a commanded torque into a commanded speed,
// re-anchored every step to the measured speed and clamped to the motor's
// physical envelope.

use core::f32::consts::PI;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};

use crate::config::{
    ConfigError, DEFAULT_FALLBACK_STEP, DEFAULT_INERTIA_KG_M2, DEFAULT_MAX_SPEED_RPM,
    DEFAULT_MAX_STEP,
};
use crate::sync::{DropOldestQueue, LatestValue};

const RPM_TO_RAD_S: f32 = 2.0 * PI / 60.0;
const RAD_S_TO_RPM: f32 = 60.0 / (2.0 * PI);

/// Source of wall-clock time for the integration step
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The embassy monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Integrator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorConfig {
    /// Moment of inertia of motor and load [kg·m²]
    pub inertia_kg_m2: f32,
    /// Speed envelope, applied symmetrically [RPM]
    pub max_speed_rpm: f32,
    /// Step used when the measured step is not positive
    pub fallback_step: Duration,
    /// Largest step ever integrated
    pub max_step: Duration,
}

impl IntegratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.inertia_kg_m2.is_finite() && self.inertia_kg_m2 > 0.0) {
            return Err(ConfigError::InvalidInertia);
        }
        if !(self.max_speed_rpm.is_finite() && self.max_speed_rpm > 0.0) {
            return Err(ConfigError::InvalidSpeedLimit);
        }
        if self.fallback_step.as_ticks() == 0 || self.fallback_step > self.max_step {
            return Err(ConfigError::InvalidStepBounds);
        }
        Ok(())
    }
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            inertia_kg_m2: DEFAULT_INERTIA_KG_M2,
            max_speed_rpm: DEFAULT_MAX_SPEED_RPM,
            fallback_step: DEFAULT_FALLBACK_STEP,
            max_step: DEFAULT_MAX_STEP,
        }
    }
}

/// Forward-Euler torque integrator, one per motor
pub struct TorqueIntegrator<C: Clock> {
    clock: C,
    /// Moment of inertia [kg·m²]
    inertia: f32,
    /// Speed envelope [rad/s]
    max_omega: f32,
    /// Fallback step [s]
    fallback_step_s: f32,
    /// Step clamp [s]
    max_step_s: f32,
    /// Time of the previous evaluation
    last_update: Instant,
    /// Angular speed accumulator [rad/s]
    omega_rad_s: f32,
    /// Step used by the previous evaluation [s]
    last_step_s: f32,
}

impl<C: Clock> TorqueIntegrator<C> {
    /// Create an integrator; the first step is measured from now
    ///
    /// # Arguments
    /// * `clock` - Time source
    /// * `config` - Parameters, expected to have passed [`IntegratorConfig::validate`]
    pub fn new(clock: C, config: &IntegratorConfig) -> Self {
        let last_update = clock.now();
        Self {
            clock,
            inertia: config.inertia_kg_m2,
            max_omega: config.max_speed_rpm * RPM_TO_RAD_S,
            fallback_step_s: duration_to_secs(config.fallback_step),
            max_step_s: duration_to_secs(config.max_step),
            last_update,
            omega_rad_s: 0.0,
            last_step_s: 0.0,
        }
    }

    /// Integrate a torque command into a speed command
    ///
    /// # Arguments
    /// * `torque_cmd` - Commanded torque [N·m]; non-finite values count as zero
    /// * `actual_rpm` - Latest measured speed [RPM], the integration anchor
    ///
    /// # Returns
    /// Commanded speed [RPM], within ±max_speed_rpm
    pub fn calculate_speed(&mut self, torque_cmd: f32, actual_rpm: f32) -> f32 {
        let now = self.clock.now();
        let dt_s = match now.checked_duration_since(self.last_update) {
            Some(elapsed) if elapsed.as_ticks() > 0 => {
                duration_to_secs(elapsed).min(self.max_step_s)
            }
            // Zero or negative step (clock wrap or equal timestamps)
            _ => self.fallback_step_s,
        };
        self.last_update = now;
        self.last_step_s = dt_s;

        let torque = if torque_cmd.is_finite() { torque_cmd } else { 0.0 };
        let anchor = if actual_rpm.is_finite() {
            actual_rpm * RPM_TO_RAD_S
        } else {
            self.omega_rad_s
        };

        // Angular acceleration [rad/s^2]
        let alpha = torque / self.inertia;

        self.omega_rad_s = (alpha * dt_s + anchor).clamp(-self.max_omega, self.max_omega);

        let rpm = self.omega_rad_s * RAD_S_TO_RPM;
        trace!(
            "Integrator: torque={} dt={}s actual={}RPM -> {}RPM",
            torque,
            dt_s,
            actual_rpm,
            rpm
        );
        rpm
    }

    /// Step used by the last [`calculate_speed`](Self::calculate_speed) [s]
    pub fn last_step_s(&self) -> f32 {
        self.last_step_s
    }

    /// Current accumulator [rad/s]
    pub fn omega_rad_s(&self) -> f32 {
        self.omega_rad_s
    }

    /// Restart integration from standstill, measuring the next step from now
    pub fn reset(&mut self) {
        self.omega_rad_s = 0.0;
        self.last_step_s = 0.0;
        self.last_update = self.clock.now();
    }
}

fn duration_to_secs(duration: Duration) -> f32 {
    duration.as_micros() as f32 / 1_000_000.0
}

/// Setpoint task body
///
/// Waits for torque commands, integrates each one against the current
/// measured speed and forwards the result to the speed-command queue.
pub async fn run_setpoint_integrator<C: Clock, M: RawMutex, const T: usize, const S: usize>(
    torque_cmd: &DropOldestQueue<M, f32, T>,
    actual_speed: &LatestValue<M, f32>,
    speed_cmd: &DropOldestQueue<M, f32, S>,
    integrator: &mut TorqueIntegrator<C>,
) -> ! {
    integrator.reset();
    info!("Setpoint integrator started");

    loop {
        let torque = torque_cmd.get().await;
        let speed = integrator.calculate_speed(torque, actual_speed.get());
        speed_cmd.put(speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct ManualClock(Cell<Instant>);

    impl ManualClock {
        fn at_ms(ms: u64) -> Self {
            Self(Cell::new(Instant::from_millis(ms)))
        }

        fn set_ms(&self, ms: u64) {
            self.0.set(Instant::from_millis(ms));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.0.get()
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3 * b.abs().max(1.0)
    }

    #[test]
    fn test_forward_euler_step() {
        let clock = ManualClock::at_ms(1_000);
        let config = IntegratorConfig::default();
        let mut integrator = TorqueIntegrator::new(&clock, &config);

        clock.set_ms(1_100);
        let rpm = integrator.calculate_speed(0.01, 0.0);

        // alpha = 0.01 / 0.001712 rad/s^2, dt = 0.1 s
        let expected = 0.01 / 0.001712 * 0.1 * RAD_S_TO_RPM;
        assert!(approx(rpm, expected), "rpm = {}, expected {}", rpm, expected);
        assert!(approx(integrator.last_step_s(), 0.1));
    }

    #[test]
    fn test_anchors_to_measured_speed() {
        let clock = ManualClock::at_ms(0);
        let mut integrator = TorqueIntegrator::new(&clock, &IntegratorConfig::default());

        clock.set_ms(10);
        assert!(approx(integrator.calculate_speed(0.0, 1200.0), 1200.0));
        clock.set_ms(20);
        // The previous output does not accumulate; only the anchor matters.
        assert!(approx(integrator.calculate_speed(0.0, -300.0), -300.0));
    }

    #[test]
    fn test_non_positive_step_uses_fallback() {
        let clock = ManualClock::at_ms(5_000);
        let mut integrator = TorqueIntegrator::new(&clock, &IntegratorConfig::default());

        // Same instant
        integrator.calculate_speed(1.0, 0.0);
        assert_eq!(integrator.last_step_s(), 0.001);

        // Clock went backwards
        clock.set_ms(4_000);
        integrator.calculate_speed(1.0, 0.0);
        assert_eq!(integrator.last_step_s(), 0.001);
    }

    #[test]
    fn test_long_step_clamped_to_one_second() {
        let clock = ManualClock::at_ms(0);
        let mut integrator = TorqueIntegrator::new(&clock, &IntegratorConfig::default());

        clock.set_ms(1_000);
        integrator.calculate_speed(0.0, 0.0);
        assert_eq!(integrator.last_step_s(), 1.0);

        clock.set_ms(61_000);
        integrator.calculate_speed(0.0, 0.0);
        assert_eq!(integrator.last_step_s(), 1.0);
    }

    #[test]
    fn test_output_never_exceeds_envelope() {
        let clock = ManualClock::at_ms(0);
        let config = IntegratorConfig::default();
        let mut integrator = TorqueIntegrator::new(&clock, &config);

        let torques = [
            1e9,
            -1e9,
            5.0,
            -5.0,
            0.0,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ];
        let anchors = [0.0, 2400.0, -2400.0, 5000.0, -5000.0];
        let steps_ms = [0u64, 1, 7, 250, 999, 1_000, 30_000];

        let mut t = 0u64;
        for torque in torques {
            for anchor in anchors {
                for step in steps_ms {
                    t += step;
                    clock.set_ms(t);
                    let rpm = integrator.calculate_speed(torque, anchor);
                    assert!(rpm.is_finite());
                    assert!(
                        rpm.abs() <= config.max_speed_rpm + 0.01,
                        "torque={} anchor={} rpm={}",
                        torque,
                        anchor,
                        rpm
                    );
                }
            }
        }
    }

    #[test]
    fn test_non_finite_torque_counts_as_zero() {
        let clock = ManualClock::at_ms(0);
        let mut integrator = TorqueIntegrator::new(&clock, &IntegratorConfig::default());
        clock.set_ms(50);
        assert!(approx(integrator.calculate_speed(f32::NAN, 800.0), 800.0));
    }

    #[test]
    fn test_reset() {
        let clock = ManualClock::at_ms(0);
        let mut integrator = TorqueIntegrator::new(&clock, &IntegratorConfig::default());
        clock.set_ms(100);
        integrator.calculate_speed(0.5, 100.0);
        assert!(integrator.omega_rad_s() > 0.0);

        integrator.reset();
        assert_eq!(integrator.omega_rad_s(), 0.0);
        assert_eq!(integrator.last_step_s(), 0.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = IntegratorConfig::default();
        assert!(config.validate().is_ok());

        config.max_speed_rpm = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSpeedLimit));

        let config = IntegratorConfig {
            fallback_step: Duration::from_secs(2),
            ..IntegratorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidStepBounds));
    }
}
