// CAN communication protocol definitions for the speed/torque command bridge

use bldc_speed_control::{MotionState, Polarity};

/// CAN message IDs
pub mod can_ids {
    /// Speed command (f32 RPM, 4 bytes)
    pub const SPEED_CMD: u32 = 0x100;

    /// Torque command (f32 N·m, 4 bytes)
    pub const TORQUE_CMD: u32 = 0x110;

    /// Motor status feedback (speed: f32, state: u8, polarity: u8, 6 bytes)
    pub const STATUS: u32 = 0x200;
}

/// Command decoded from a received frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Target speed [RPM]
    Speed(f32),
    /// Target torque [N·m]
    Torque(f32),
}

/// Motor status structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorStatus {
    pub speed_rpm: f32,
    pub state: MotionState,
    pub polarity: Polarity,
}

/// Read a little-endian f32 from the first 4 bytes
fn parse_f32(data: &[u8]) -> Option<f32> {
    match data {
        [b0, b1, b2, b3, ..] => Some(f32::from_le_bytes([*b0, *b1, *b2, *b3])),
        _ => None,
    }
}

/// Parse speed command from CAN data
///
/// # Arguments
/// * `data` - CAN frame data (should be 4 bytes)
///
/// # Returns
/// * `Some(speed_rpm)` if parsing successful
/// * `None` if data length is incorrect
pub fn parse_speed_command(data: &[u8]) -> Option<f32> {
    let Some(speed_rpm) = parse_f32(data) else {
        error!("Speed command: invalid data length {}", data.len());
        return None;
    };

    info!("Speed command received: {} RPM", speed_rpm);
    Some(speed_rpm)
}

/// Parse torque command from CAN data
///
/// # Arguments
/// * `data` - CAN frame data (should be 4 bytes)
///
/// # Returns
/// * `Some(torque_nm)` if parsing successful
/// * `None` if data length is incorrect
pub fn parse_torque_command(data: &[u8]) -> Option<f32> {
    let Some(torque_nm) = parse_f32(data) else {
        error!("Torque command: invalid data length {}", data.len());
        return None;
    };

    debug!("Torque command received: {} Nm", torque_nm);
    Some(torque_nm)
}

/// Decode a received frame
///
/// Unknown ids and malformed payloads yield `None`.
pub fn decode_command(id: u32, data: &[u8]) -> Option<Command> {
    match id {
        can_ids::SPEED_CMD => parse_speed_command(data).map(Command::Speed),
        can_ids::TORQUE_CMD => parse_torque_command(data).map(Command::Torque),
        _ => None,
    }
}

/// Encode motor status into CAN data
///
/// # Returns
/// 6-byte array: speed (f32 LE), state code, polarity (0 = forward, 1 = reverse)
pub fn encode_status(status: &MotorStatus) -> [u8; 6] {
    let mut data = [0u8; 6];

    data[0..4].copy_from_slice(&status.speed_rpm.to_le_bytes());
    data[4] = status.state.code();
    data[5] = status.polarity.is_high() as u8;

    data
}
