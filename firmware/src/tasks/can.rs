//! CAN通信タスク
//!
//! 速度指令・トルク指令の受信とステータス送信を行います。

use bldc_speed_control::Pipeline;
use embassy_futures::select::{select, Either};
use embassy_stm32::can;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Ticker;
use embedded_can::{Id, StandardId};

use crate::can_protocol::{can_ids, decode_command, encode_status, Command, MotorStatus};
use crate::config;

/// CAN通信タスク - 指令を制御パスのキューへ転送し、ステータスを送信
#[embassy_executor::task]
pub async fn can_task(
    can: can::Can<'static>,
    pipeline: &'static Pipeline<CriticalSectionRawMutex>,
) {
    let (mut tx, mut rx, _properties) = can.split();

    info!("CAN command bridge started");

    // ステータス送信用タイマー（100ms周期）
    let mut status_ticker = Ticker::every(config::can::STATUS_PERIOD);

    loop {
        // CANフレーム受信とステータス送信を並行処理
        match select(rx.read(), status_ticker.next()).await {
            Either::First(Ok(envelope)) => {
                let frame = envelope.frame;
                let header = frame.header();

                // IDを数値として取得
                let id_raw = match header.id() {
                    Id::Standard(std_id) => std_id.as_raw() as u32,
                    Id::Extended(ext_id) => ext_id.as_raw(),
                };

                match decode_command(id_raw, frame.data()) {
                    Some(Command::Speed(rpm)) => pipeline.speed_cmd.put(rpm),
                    Some(Command::Torque(torque)) => pipeline.torque_cmd.put(torque),
                    None => {
                        debug!("Ignored CAN ID: 0x{:03X}", id_raw);
                    }
                }
            }
            Either::First(Err(_e)) => {
                // error!("CAN RX Error: {:?}", _e);
            }
            Either::Second(()) => {
                // モーターステータス送信 (ID 0x200)
                let status = MotorStatus {
                    speed_rpm: pipeline.actual_speed.get(),
                    state: pipeline.motion_state.get(),
                    polarity: pipeline.polarity.get(),
                };
                let data = encode_status(&status);

                if let Some(std_id) = StandardId::new(can_ids::STATUS as u16) {
                    let id = Id::Standard(std_id);
                    if let Ok(frame) = can::frame::Frame::new_data(id, &data) {
                        let _ = tx.write(&frame).await;
                    }
                }
            }
        }
    }
}
