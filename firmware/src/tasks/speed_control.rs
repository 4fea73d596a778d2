//! 速度制御タスク
//!
//! 加速・ブレーキ減速・ゼロクロス反転の状態機械を実行します。
//! Idle では速度指令を待ち、それ以外では 10ms 周期で再評価する。

use bldc_speed_control::run_speed_control;
use bldc_speed_control::speed_control::SpeedControlConfig;
use bldc_speed_control::Pipeline;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::drv8308::Drv8308;

/// 速度制御タスク（スレッドモードエグゼキュータで実行）
#[embassy_executor::task]
pub async fn speed_control_task(
    pipeline: &'static Pipeline<CriticalSectionRawMutex>,
    mut driver: Drv8308,
    config: SpeedControlConfig,
) {
    run_speed_control(
        &pipeline.speed_cmd,
        &pipeline.actual_speed,
        &mut driver,
        &config,
        &pipeline.motion_state,
    )
    .await
}
