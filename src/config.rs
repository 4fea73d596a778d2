//! Configuration module
//!
//! Compile-time defaults live in [`params`]; the runtime structs below are
//! built from them and validated once at start-up.

pub mod params;

pub use params::*;

use crate::integrator::IntegratorConfig;
use crate::speed_control::SpeedControlConfig;
use crate::speed_estimator::EstimatorConfig;

/// Rejected configuration values
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("moment of inertia must be positive and finite")]
    InvalidInertia,
    #[error("speed limit must be positive and finite")]
    InvalidSpeedLimit,
    #[error("deadband must be non-negative and finite")]
    InvalidDeadband,
    #[error("RPM-per-Hz scale must be positive and finite")]
    InvalidSpeedScale,
    #[error("integration step bounds must satisfy 0 < fallback <= max")]
    InvalidStepBounds,
    #[error("poll interval and silence timeout must be non-zero")]
    ZeroInterval,
}

/// Complete configuration of the control path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    pub estimator: EstimatorConfig,
    pub integrator: IntegratorConfig,
    pub speed_control: SpeedControlConfig,
}

impl ControlConfig {
    /// Check every section
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.estimator.validate()?;
        self.integrator.validate()?;
        self.speed_control.validate()?;
        Ok(self)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            integrator: IntegratorConfig::default(),
            speed_control: SpeedControlConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ControlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_first_invalid_section_is_reported() {
        let mut config = ControlConfig::default();
        config.integrator.inertia_kg_m2 = 0.0;
        config.speed_control.deadband_rpm = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidInertia));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = ControlConfig::default();
        config.speed_control.poll_interval = Duration::from_ticks(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }
}
