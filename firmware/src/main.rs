#![no_std]
#![no_main]

mod fmt;

mod can_protocol;
mod config;
mod drv8308;
mod fg_exti;
mod hardware;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    can,
    gpio::{Level, Output, OutputType, Speed},
    interrupt::{self, InterruptExt},
    time::Hertz,
    timer::{
        low_level::CountingMode,
        simple_pwm::{PwmPin, SimplePwm},
    },
};
use embassy_time::{Duration, Ticker};

use config::ControlConfig;
use drv8308::Drv8308;
use hardware::Irqs;
use state::{EXECUTOR_ESTIMATOR, EXECUTOR_SETPOINT, PIPELINE};
use tasks::{can_task, led_task, setpoint_task, speed_control_task, speed_estimator_task};

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_ESTIMATOR.on_interrupt()
}

#[interrupt]
unsafe fn USART3() {
    EXECUTOR_SETPOINT.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let clock_config = hardware::create_clock_config();
    let p = embassy_stm32::init(clock_config);

    info!("═══════════════════════════════════════════════════");
    info!("   BLDC speed/torque control • DRV8308 + STM32G431");
    info!("═══════════════════════════════════════════════════");

    // 制御パラメータ（不正値なら起動しない）
    let control = unwrap!(ControlConfig::default().validate());
    info!(
        "Deadband={} RPM, poll={} ms, J={} kg*m^2, limit={} RPM",
        control.speed_control.deadband_rpm,
        control.speed_control.poll_interval.as_millis(),
        control.integrator.inertia_kg_m2,
        control.integrator.max_speed_rpm
    );

    // DRV8308 ピン初期化（正転、ブレーキ解除、CLKIN停止）
    let dir = Output::new(p.PC6, Level::Low, Speed::Low);
    let brake = Output::new(p.PC7, Level::Low, Speed::Low);
    let clkin = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new(p.PB4, OutputType::PushPull)),
        None,
        None,
        None,
        Hertz(config::clkin::INITIAL_FREQUENCY_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let driver = Drv8308::new(
        dir,
        brake,
        clkin,
        &PIPELINE.polarity,
        control.estimator.rpm_per_hz,
    );

    // 速度推定タスク（割り込みエグゼキュータ、最高優先度）
    interrupt::UART4.set_priority(config::priority::SPEED_ESTIMATOR);
    let estimator_spawner = EXECUTOR_ESTIMATOR.start(interrupt::UART4);
    estimator_spawner.spawn(unwrap!(speed_estimator_task(&PIPELINE, control.estimator)));

    // トルク積分タスク（割り込みエグゼキュータ）
    interrupt::USART3.set_priority(config::priority::SETPOINT);
    let setpoint_spawner = EXECUTOR_SETPOINT.start(interrupt::USART3);
    setpoint_spawner.spawn(unwrap!(setpoint_task(&PIPELINE, control.integrator)));

    // FGOUT エッジ割り込み（推定タスク起動後に有効化）
    unsafe {
        hardware::init_fgout();
    }

    // 速度制御タスク（スレッドモード）
    spawner.spawn(unwrap!(speed_control_task(
        &PIPELINE,
        driver,
        control.speed_control
    )));

    // CAN初期化＆タスク起動
    let mut can_configurator = can::CanConfigurator::new(p.FDCAN1, p.PA11, p.PA12, Irqs);
    can_configurator.properties().set_standard_filter(
        can::filter::StandardFilterSlot::_0,
        can::filter::StandardFilter::accept_all_into_fifo0(),
    );
    can_configurator.set_bitrate(config::can::DEFAULT_BITRATE);
    let can = can_configurator.start(can::OperatingMode::NormalOperationMode);
    spawner.spawn(unwrap!(can_task(can, &PIPELINE)));

    // LED初期化＆タスク起動
    let led1 = Output::new(p.PC13, Level::High, Speed::Low);
    let led2 = Output::new(p.PC14, Level::High, Speed::Low);
    let led3 = Output::new(p.PC15, Level::High, Speed::Low);
    spawner.spawn(unwrap!(led_task(led1, led2, led3, &PIPELINE)));

    info!("Speed control pipeline running");

    // メインループ（1秒ごとの状態ログ）
    let mut ticker = Ticker::every(Duration::from_secs(1));
    loop {
        ticker.next().await;
        debug!(
            "actual={} RPM state={} dir={} edges dropped={}",
            PIPELINE.actual_speed.get(),
            PIPELINE.motion_state.get(),
            PIPELINE.polarity.get(),
            PIPELINE.edges.overwritten()
        );
    }
}
