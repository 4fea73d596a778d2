//! ハードウェア初期化モジュール
//!
//! クロック設定、割り込みバインド、FGOUT エッジ割り込みの初期化を集約します。

use embassy_stm32::{bind_interrupts, can, peripherals, Config};

use crate::fg_exti;

// CANの割り込みをバインド
bind_interrupts!(pub struct Irqs {
    FDCAN1_IT0 => can::IT0InterruptHandler<peripherals::FDCAN1>;
    FDCAN1_IT1 => can::IT1InterruptHandler<peripherals::FDCAN1>;
});

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{ClockMux, Fdcansel};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllQDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: Some(PllQDiv::DIV2), // FDCANクロック用
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;

        let mut clock_mux = ClockMux::default();
        clock_mux.fdcansel = Fdcansel::PLL1_Q;
        config.rcc.mux = clock_mux;
    }
    config
}

/// FGOUT エッジ割り込み初期化
///
/// PB6 = FGOUT（EXTI6、立ち上がりエッジ）
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_fgout() {
    info!("Initializing FGOUT edge capture on PB6 (EXTI6)...");
    fg_exti::init_fgout_exti();
    info!("FGOUT edge capture initialized");
}
