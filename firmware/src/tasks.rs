//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod can;
pub mod led;
pub mod setpoint;
pub mod speed_control;
pub mod speed_estimator;

// タスク関数を再エクスポート
pub use can::can_task;
pub use led::led_task;
pub use setpoint::setpoint_task;
pub use speed_control::speed_control_task;
pub use speed_estimator::speed_estimator_task;
