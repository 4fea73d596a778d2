//! Motor driver collaborator
//!
//! The driver only closes the loop while accelerating. Deceleration is done by
//! braking and reversal by flipping the DIR polarity, so the interface exposes
//! exactly those primitives plus an unsigned speed command.

use core::sync::atomic::{AtomicBool, Ordering};

/// Rotation direction as seen on the driver's DIR input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// DIR low, positive speeds
    Forward,
    /// DIR high, negative speeds
    Reverse,
}

impl Polarity {
    /// +1 for Forward, -1 for Reverse
    pub fn sign(self) -> i8 {
        match self {
            Polarity::Forward => 1,
            Polarity::Reverse => -1,
        }
    }

    /// DIR pin level for this polarity
    pub fn is_high(self) -> bool {
        self == Polarity::Reverse
    }

    /// Polarity for a DIR pin level
    pub fn from_level(high: bool) -> Self {
        if high {
            Polarity::Reverse
        } else {
            Polarity::Forward
        }
    }
}

/// Sign of a speed value, with zero counted as positive
#[inline]
pub fn sign(x: f32) -> i8 {
    if x >= 0.0 {
        1
    } else {
        -1
    }
}

/// Read access to the current DIR polarity
pub trait DirectionSense {
    fn direction(&self) -> Polarity;
}

/// Pin-level control of the motor driver
///
/// Calls are synchronous and must not block.
pub trait MotorDriver: DirectionSense {
    /// Drive the DIR pin
    fn set_direction(&mut self, polarity: Polarity);

    /// Engage the brake; the driver ignores speed commands while braked
    fn brake(&mut self);

    /// Release the brake
    fn unbrake(&mut self);

    /// Command a speed magnitude [RPM]; the sign is carried by the polarity
    fn command_speed(&mut self, magnitude_rpm: f32);
}

/// Lock-free mirror of the DIR pin
///
/// The driver adapter writes it whenever it drives the pin; the speed
/// estimator reads it from another task without touching the driver.
pub struct PolarityCell {
    reverse: AtomicBool,
}

impl PolarityCell {
    pub const fn new(polarity: Polarity) -> Self {
        Self {
            reverse: AtomicBool::new(matches!(polarity, Polarity::Reverse)),
        }
    }

    pub fn set(&self, polarity: Polarity) {
        self.reverse.store(polarity.is_high(), Ordering::Release);
    }

    pub fn get(&self) -> Polarity {
        Polarity::from_level(self.reverse.load(Ordering::Acquire))
    }
}

impl DirectionSense for PolarityCell {
    fn direction(&self) -> Polarity {
        self.get()
    }
}

impl<T: DirectionSense + ?Sized> DirectionSense for &T {
    fn direction(&self) -> Polarity {
        (**self).direction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_zero_is_positive() {
        assert_eq!(sign(0.0), 1);
        assert_eq!(sign(-0.0), 1);
        assert_eq!(sign(0.001), 1);
        assert_eq!(sign(-0.001), -1);
    }

    #[test]
    fn test_polarity_pin_mapping() {
        assert!(!Polarity::Forward.is_high());
        assert!(Polarity::Reverse.is_high());
        assert_eq!(Polarity::from_level(false), Polarity::Forward);
        assert_eq!(Polarity::from_level(true), Polarity::Reverse);
        assert_eq!(Polarity::Reverse.sign(), -1);
    }

    #[test]
    fn test_polarity_cell() {
        let cell = PolarityCell::new(Polarity::Forward);
        assert_eq!(cell.direction(), Polarity::Forward);
        cell.set(Polarity::Reverse);
        assert_eq!(cell.get(), Polarity::Reverse);
        assert_eq!((&cell).direction(), Polarity::Reverse);
    }
}
