//! LED制御タスク
//!
//! LED1: ハートビート、LED2: ブレーキ中（Decelerating）、LED3: 逆転（DIR = High）
//! LEDはアクティブLow。

use bldc_speed_control::{MotionState, Pipeline, Polarity};
use embassy_stm32::gpio::{Level, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Ticker;

use crate::config::led::{HEARTBEAT_HALF_PERIOD, REFRESH_PERIOD};

/// 点灯状態をアクティブLowのピンレベルに変換
fn led_level(on: bool) -> Level {
    if on {
        Level::Low
    } else {
        Level::High
    }
}

/// LED制御タスク
#[embassy_executor::task]
pub async fn led_task(
    mut heartbeat: Output<'static>,
    mut brake: Output<'static>,
    mut reverse: Output<'static>,
    pipeline: &'static Pipeline<CriticalSectionRawMutex>,
) {
    info!("LED task started");

    let mut ticker = Ticker::every(REFRESH_PERIOD);
    let ticks_per_toggle = (HEARTBEAT_HALF_PERIOD.as_ticks() / REFRESH_PERIOD.as_ticks()).max(1);
    let mut ticks = 0u64;
    let mut heartbeat_on = false;

    loop {
        ticks += 1;
        if ticks >= ticks_per_toggle {
            ticks = 0;
            heartbeat_on = !heartbeat_on;
            heartbeat.set_level(led_level(heartbeat_on));
        }

        brake.set_level(led_level(
            pipeline.motion_state.get() == MotionState::Decelerating,
        ));
        reverse.set_level(led_level(pipeline.polarity.get() == Polarity::Reverse));

        ticker.next().await;
    }
}
