//! ボード固有パラメータ

/// CLKIN（DRV8308 速度指令）設定
pub mod clkin {
    /// デューティ比 [%]（DRV8308 は周波数のみを見る）
    pub const DUTY_PERCENT: u8 = 50;

    /// 初期化時の周波数（チャネルは無効のまま）
    pub const INITIAL_FREQUENCY_HZ: u32 = 1_000;
}

/// 割り込み優先度（0 が最高、上位4ビットのみ有効）
pub mod priority {
    use embassy_stm32::interrupt::Priority;

    /// FGOUT エッジ割り込み
    pub const FGOUT_EDGE: Priority = Priority::P1;

    /// 速度推定タスクの割り込みエグゼキュータ
    pub const SPEED_ESTIMATOR: Priority = Priority::P2;

    /// トルク積分タスクの割り込みエグゼキュータ
    pub const SETPOINT: Priority = Priority::P3;
}

/// CAN設定
pub mod can {
    use embassy_time::Duration;

    /// CANビットレート（250kbps）（デフォルト値）
    pub const DEFAULT_BITRATE: u32 = 250_000;

    /// ステータス送信周期
    pub const STATUS_PERIOD: Duration = Duration::from_millis(100);
}

/// LED設定
pub mod led {
    use embassy_time::Duration;

    /// ハートビート半周期
    pub const HEARTBEAT_HALF_PERIOD: Duration = Duration::from_millis(500);

    /// 状態表示の更新周期
    pub const REFRESH_PERIOD: Duration = Duration::from_millis(50);
}
