//! Configuration module
//!
//! 制御パスのパラメータはライブラリ側（`bldc_speed_control::config`）、
//! ここにはボード固有の設定のみを置く。

pub mod params;

pub use params::*;

pub use bldc_speed_control::config::{ConfigError, ControlConfig};
