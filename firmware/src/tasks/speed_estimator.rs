//! 速度推定タスク
//!
//! FGOUT エッジのタイムスタンプから符号付き RPM を計算し、実速度として公開します。
//! エッジが来たときだけ動くため、実行周期はモーターの電気角周期に等しい。

use bldc_speed_control::run_speed_estimator;
use bldc_speed_control::speed_estimator::EstimatorConfig;
use bldc_speed_control::Pipeline;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// 速度推定タスク（最高優先度の割り込みエグゼキュータで実行）
#[embassy_executor::task]
pub async fn speed_estimator_task(
    pipeline: &'static Pipeline<CriticalSectionRawMutex>,
    config: EstimatorConfig,
) {
    run_speed_estimator(
        &pipeline.edges,
        &pipeline.actual_speed,
        &pipeline.polarity,
        &config,
    )
    .await
}
