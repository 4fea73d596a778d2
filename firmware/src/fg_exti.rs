//! FGOUT エッジ割り込み（EXTI6）
//!
//! DRV8308 の FGOUT は電気角周波数の矩形波を出力する。立ち上がりエッジ毎に
//! EXTI 割り込みでタイムスタンプを取り、エッジキューに積むだけの最小処理とする。
//!
//! ## ハードウェア構成
//! - PB6: FGOUT（入力、外部プルアップ）
//! - EXTI6 → EXTI9_5 割り込みベクタ

use bldc_speed_control::edge::capture_edge;
use embassy_stm32::interrupt::{self, InterruptExt};
use embassy_stm32::pac;

use crate::config::priority;
use crate::state::PIPELINE;

/// FGOUT のピン番号 = EXTI ライン番号
const FGOUT_LINE: usize = 6;

/// ポートB（EXTICR の選択値）
const PORT_B: u8 = 1;

/// EXTI6 の初期化
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
pub unsafe fn init_fgout_exti() {
    let rcc = pac::RCC;
    let gpiob = pac::GPIOB;
    let syscfg = pac::SYSCFG;
    let exti = pac::EXTI;

    // 1. クロック有効化
    rcc.ahb2enr().modify(|w| w.set_gpioben(true)); // GPIOB
    rcc.apb2enr().modify(|w| w.set_syscfgen(true)); // SYSCFG（EXTI ポート選択）

    // 2. PB6 を入力に設定（DRV8308 側のオープンドレインに外部プルアップ）
    gpiob
        .moder()
        .modify(|w| w.set_moder(FGOUT_LINE, pac::gpio::vals::Moder::INPUT));
    gpiob
        .pupdr()
        .modify(|w| w.set_pupdr(FGOUT_LINE, pac::gpio::vals::Pupdr::FLOATING));

    // 3. EXTI6 をポートBに接続（EXTICR2 の 3番目のフィールド）
    syscfg
        .exticr(FGOUT_LINE / 4)
        .modify(|w| w.set_exti(FGOUT_LINE % 4, PORT_B));

    // 4. 立ち上がりエッジのみ
    exti.rtsr(0).modify(|w| w.set_line(FGOUT_LINE, true));
    exti.ftsr(0).modify(|w| w.set_line(FGOUT_LINE, false));

    // 保留中のフラグをクリアしてから有効化
    exti.pr(0).write(|w| w.set_line(FGOUT_LINE, true));
    exti.imr(0).modify(|w| w.set_line(FGOUT_LINE, true));

    // 5. NVIC（全タスクより高優先度）
    interrupt::EXTI9_5.set_priority(priority::FGOUT_EDGE);
    interrupt::EXTI9_5.unpend();
    interrupt::EXTI9_5.enable();
}

/// EXTI9_5割り込みのRust側エントリーポイント
///
/// ブロックせず、ログも出さない。キューが満杯なら最古のエッジが捨てられる。
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn EXTI9_5() {
    let exti = pac::EXTI;

    if exti.pr(0).read().line(FGOUT_LINE) {
        exti.pr(0).write(|w| w.set_line(FGOUT_LINE, true)); // フラグクリア
        capture_edge(&PIPELINE.edges);
    }
}
