//! グローバル共有状態管理
//!
//! 割り込みハンドラから到達できる必要があるのは制御パスのキューと共有値のみ。
//! タスクには `&'static Pipeline` として渡す。

use bldc_speed_control::Pipeline;
use embassy_executor::InterruptExecutor;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// 制御パス（エッジキュー、指令キュー、実速度、状態、DIR）
///
/// EXTI 割り込みと複数のエグゼキュータから触るため CriticalSectionRawMutex を使う
pub static PIPELINE: Pipeline<CriticalSectionRawMutex> = Pipeline::new();

/// 速度推定タスク用エグゼキュータ（最高優先度）
pub static EXECUTOR_ESTIMATOR: InterruptExecutor = InterruptExecutor::new();

/// トルク積分タスク用エグゼキュータ
pub static EXECUTOR_SETPOINT: InterruptExecutor = InterruptExecutor::new();
