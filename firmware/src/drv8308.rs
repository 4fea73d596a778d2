//! DRV8308 ピンレベルドライバー
//!
//! DRV8308 の内部速度ループは CLKIN の周波数を目標として加速のみ行う。
//! 減速は BRAKE、反転は DIR で外部から制御する。
//!
//! ## ハードウェア構成
//! - PC6: DIR（Low = 正転、High = 逆転）
//! - PC7: BRAKE（High = ブレーキ）
//! - PB4: CLKIN（TIM3_CH1、50% 矩形波、周波数 = RPM / 15）
//!
//! SPI によるレジスタ設定は対象外。

use bldc_speed_control::motor::{DirectionSense, MotorDriver, Polarity, PolarityCell};
use embassy_stm32::{
    gpio::Output,
    peripherals,
    time::Hertz,
    timer::{simple_pwm::SimplePwm, Channel},
};
use libm::roundf;

use crate::config::clkin;

/// DRV8308 ドライバー
pub struct Drv8308 {
    dir: Output<'static>,
    brake: Output<'static>,
    clkin: SimplePwm<'static, peripherals::TIM3>,
    /// DIR の状態を速度推定タスクへ公開するミラー
    polarity: &'static PolarityCell,
    rpm_per_hz: f32,
    /// 現在の CLKIN 周波数 [Hz]（0 = 停止）
    clkin_hz: u32,
}

impl Drv8308 {
    /// 新しいドライバーを作成（CLKIN 停止、DIR は現在のピン状態を保持）
    ///
    /// # 引数
    /// * `dir` - DIR 出力ピン
    /// * `brake` - BRAKE 出力ピン
    /// * `clkin` - CLKIN 用 PWM（TIM3）
    /// * `polarity` - DIR ミラー
    /// * `rpm_per_hz` - CLKIN 1Hz あたりの RPM
    pub fn new(
        dir: Output<'static>,
        brake: Output<'static>,
        mut clkin: SimplePwm<'static, peripherals::TIM3>,
        polarity: &'static PolarityCell,
        rpm_per_hz: f32,
    ) -> Self {
        clkin.channel(Channel::Ch1).disable();
        polarity.set(Polarity::from_level(dir.is_set_high()));

        Self {
            dir,
            brake,
            clkin,
            polarity,
            rpm_per_hz,
            clkin_hz: 0,
        }
    }
}

impl DirectionSense for Drv8308 {
    fn direction(&self) -> Polarity {
        Polarity::from_level(self.dir.is_set_high())
    }
}

impl MotorDriver for Drv8308 {
    fn set_direction(&mut self, polarity: Polarity) {
        if polarity.is_high() {
            self.dir.set_high();
        } else {
            self.dir.set_low();
        }
        self.polarity.set(polarity);
        debug!("DIR -> {}", polarity);
    }

    fn brake(&mut self) {
        self.brake.set_high();
    }

    fn unbrake(&mut self) {
        self.brake.set_low();
    }

    fn command_speed(&mut self, magnitude_rpm: f32) {
        // CLKIN の分解能は 1Hz（= 15 RPM）
        let hz = if magnitude_rpm.is_finite() && magnitude_rpm > 0.0 {
            roundf(magnitude_rpm / self.rpm_per_hz) as u32
        } else {
            0
        };

        if hz == self.clkin_hz {
            return;
        }
        self.clkin_hz = hz;

        if hz == 0 {
            self.clkin.channel(Channel::Ch1).disable();
        } else {
            // 周波数変更で ARR が変わるため、デューティは毎回設定し直す
            self.clkin.set_frequency(Hertz(hz));
            let mut ch = self.clkin.channel(Channel::Ch1);
            ch.set_duty_cycle_percent(clkin::DUTY_PERCENT);
            ch.enable();
        }
        trace!("CLKIN -> {} Hz", hz);
    }
}
