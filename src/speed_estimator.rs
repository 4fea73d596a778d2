//! Speed estimation from FGOUT edge timestamps
//!
//! The DRV8308 outputs a square wave at the motor's electrical frequency on
//! FGOUT. One rising edge per period is timestamped by the interrupt handler;
//! the interval between consecutive edges gives the electrical frequency, and
//! the mechanical speed is that frequency times [`DEFAULT_RPM_PER_HZ`]. The
//! signal carries no direction information, so the sign comes from the DIR
//! polarity at the time the edge is processed.
//!
//! The task only runs when an edge is pending, so its rate equals the edge
//! rate (at most 2500 / 15 ≈ 167 Hz with the integrator's speed clamp).

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};

use crate::config::{ConfigError, DEFAULT_RPM_PER_HZ, DEFAULT_SILENCE_TIMEOUT};
use crate::edge::EdgeTimestamp;
use crate::motor::{DirectionSense, Polarity};
use crate::sync::{DropOldestQueue, LatestValue};

/// Speed estimator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Mechanical RPM per Hz of FGOUT
    pub rpm_per_hz: f32,
    /// Edge-free time after which the sensor is treated as silent
    pub silence_timeout: Duration,
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpm_per_hz.is_finite() && self.rpm_per_hz > 0.0) {
            return Err(ConfigError::InvalidSpeedScale);
        }
        if self.silence_timeout.as_ticks() == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            rpm_per_hz: DEFAULT_RPM_PER_HZ,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
        }
    }
}

/// Edge-interval speed estimator
pub struct SpeedEstimator {
    /// Timestamp of the previous edge
    last_edge: EdgeTimestamp,
    /// Mechanical RPM per Hz
    rpm_per_hz: f32,
    /// Edge-free time accumulated since `last_edge` [µs]
    silent_us: u64,
    /// Last published estimate [RPM]
    last_rpm: f32,
}

impl SpeedEstimator {
    /// Create an estimator whose first interval is measured from `reference`
    pub fn new(reference: EdgeTimestamp, rpm_per_hz: f32) -> Self {
        Self {
            last_edge: reference,
            rpm_per_hz,
            silent_us: 0,
            last_rpm: 0.0,
        }
    }

    /// Process one edge
    ///
    /// # Returns
    /// * `Some(rpm)` - signed speed to publish
    /// * `None` - zero interval, or the silence outlasted the 32-bit µs
    ///   counter; nothing to publish
    pub fn on_edge(&mut self, edge: EdgeTimestamp, polarity: Polarity) -> Option<f32> {
        let dt_us = edge.wrapping_micros_since(self.last_edge);
        self.last_edge = edge;

        // The real interval is at least the accumulated silence. A shorter
        // wrapped difference means the counter went all the way round.
        let wrapped = u64::from(dt_us) < self.silent_us;
        self.silent_us = 0;
        if wrapped {
            trace!("FGOUT edge after counter wrap, reference re-synchronised");
            return None;
        }

        if dt_us == 0 {
            return None;
        }

        let frequency_hz = 1_000_000.0 / dt_us as f32;
        let rpm = frequency_hz * self.rpm_per_hz * f32::from(polarity.sign());

        self.last_rpm = rpm;
        Some(rpm)
    }

    /// No edge arrived for `elapsed`
    ///
    /// The published speed is held. The next edge is still measured from the
    /// previous one unless the silence spans a full counter period.
    pub fn on_silence(&mut self, elapsed: Duration) {
        if self.silent_us == 0 {
            warn!(
                "FGOUT silent, holding last speed estimate {} RPM",
                self.last_rpm
            );
        }
        self.silent_us = self.silent_us.saturating_add(elapsed.as_micros());
    }

    /// At least one silence timeout since the last edge
    pub fn is_silent(&self) -> bool {
        self.silent_us > 0
    }

    /// Last speed returned by [`on_edge`](Self::on_edge) [RPM]
    pub fn last_rpm(&self) -> f32 {
        self.last_rpm
    }
}

/// Speed estimator task body
///
/// Consumes edge timestamps in arrival order and publishes the signed speed
/// to `actual_speed`. Never returns.
pub async fn run_speed_estimator<M: RawMutex, S: DirectionSense, const N: usize>(
    edges: &DropOldestQueue<M, EdgeTimestamp, N>,
    actual_speed: &LatestValue<M, f32>,
    direction: &S,
    config: &EstimatorConfig,
) -> ! {
    edges.clear();
    let mut estimator = SpeedEstimator::new(EdgeTimestamp::now(), config.rpm_per_hz);
    let mut reported_overwrites = edges.overwritten();

    info!(
        "Speed estimator started: {} RPM/Hz, silence timeout {} ms",
        config.rpm_per_hz,
        config.silence_timeout.as_millis()
    );

    loop {
        match select(edges.get(), Timer::after(config.silence_timeout)).await {
            Either::First(edge) => {
                if let Some(rpm) = estimator.on_edge(edge, direction.direction()) {
                    actual_speed.put(rpm);
                }
            }
            Either::Second(()) => estimator.on_silence(config.silence_timeout),
        }

        let overwrites = edges.overwritten();
        if overwrites != reported_overwrites {
            warn!(
                "Edge queue overflow, {} timestamps dropped",
                overwrites.wrapping_sub(reported_overwrites)
            );
            reported_overwrites = overwrites;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_6667us_interval_is_2250_rpm() {
        let mut estimator = SpeedEstimator::new(EdgeTimestamp::from_micros(1_000), 15.0);
        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(7_667), Polarity::Forward)
            .unwrap();
        // 1 / 6.667 ms = 149.99 Hz
        assert!(approx(rpm, 2250.0, 0.5), "rpm = {}", rpm);
        assert!(rpm > 0.0);
    }

    #[test]
    fn test_reverse_polarity_is_negative() {
        let mut estimator = SpeedEstimator::new(EdgeTimestamp::from_micros(0), 15.0);
        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(10_000), Polarity::Reverse)
            .unwrap();
        assert!(approx(rpm, -1500.0, 0.01));
        assert_eq!(estimator.last_rpm(), rpm);
    }

    #[test]
    fn test_zero_interval_discarded() {
        let mut estimator = SpeedEstimator::new(EdgeTimestamp::from_micros(500), 15.0);
        assert_eq!(
            estimator.on_edge(EdgeTimestamp::from_micros(500), Polarity::Forward),
            None
        );
        // The reference is unchanged, so the next interval is measured from 500.
        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(10_500), Polarity::Forward)
            .unwrap();
        assert!(approx(rpm, 1500.0, 0.01));
    }

    #[test]
    fn test_interval_across_counter_wrap() {
        let mut estimator =
            SpeedEstimator::new(EdgeTimestamp::from_micros(u32::MAX - 4_999), 15.0);
        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(5_000), Polarity::Forward)
            .unwrap();
        // 10 ms interval -> 100 Hz
        assert!(approx(rpm, 1500.0, 0.01));
    }

    #[test]
    fn test_interval_after_silence_is_published() {
        let mut estimator = SpeedEstimator::new(EdgeTimestamp::from_micros(0), 15.0);
        let first = estimator.on_edge(EdgeTimestamp::from_micros(600_000), Polarity::Forward);
        assert!(approx(first.unwrap(), 25.0, 0.01));

        estimator.on_silence(Duration::from_secs(1));
        assert!(estimator.is_silent());
        assert!(approx(estimator.last_rpm(), 25.0, 0.01));

        // 1.2 s between edges, below one edge per second
        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(1_800_000), Polarity::Forward)
            .unwrap();
        assert!(approx(rpm, 12.5, 0.01), "rpm = {}", rpm);
        assert!(!estimator.is_silent());
    }

    #[test]
    fn test_silence_longer_than_counter_resyncs() {
        let mut estimator = SpeedEstimator::new(EdgeTimestamp::from_micros(0), 15.0);
        estimator.on_edge(EdgeTimestamp::from_micros(10_000), Polarity::Forward);

        // 2^32 µs is about 71.6 minutes
        for _ in 0..4_300 {
            estimator.on_silence(Duration::from_secs(1));
        }
        assert_eq!(
            estimator.on_edge(EdgeTimestamp::from_micros(5_000_000), Polarity::Forward),
            None
        );
        assert!(approx(estimator.last_rpm(), 1500.0, 0.01));

        let rpm = estimator
            .on_edge(EdgeTimestamp::from_micros(5_020_000), Polarity::Forward)
            .unwrap();
        assert!(approx(rpm, 750.0, 0.01));
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());
        let config = EstimatorConfig {
            rpm_per_hz: 0.0,
            ..EstimatorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSpeedScale));
    }
}
