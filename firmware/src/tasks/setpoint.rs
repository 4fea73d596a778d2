//! トルク積分タスク
//!
//! トルク指令を受信するたびに前進オイラー積分で速度指令を計算し、
//! 速度指令キューへ送ります。トルク指令の受信周期がそのまま制御周期になる。

use bldc_speed_control::integrator::IntegratorConfig;
use bldc_speed_control::{run_setpoint_integrator, Pipeline, SystemClock, TorqueIntegrator};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// トルク積分タスク（速度推定より低優先度の割り込みエグゼキュータで実行）
#[embassy_executor::task]
pub async fn setpoint_task(
    pipeline: &'static Pipeline<CriticalSectionRawMutex>,
    config: IntegratorConfig,
) {
    let mut integrator = TorqueIntegrator::new(SystemClock, &config);

    info!(
        "Integrator: J={} kg*m^2, limit={} RPM",
        config.inertia_kg_m2, config.max_speed_rpm
    );

    run_setpoint_integrator(
        &pipeline.torque_cmd,
        &pipeline.actual_speed,
        &pipeline.speed_cmd,
        &mut integrator,
    )
    .await
}
