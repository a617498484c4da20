//! Decoding for the SensorTag IR thermometer data characteristic.

use crate::{error::SensorError, types::Temperature};

/// Data characteristic layout: object word in bytes 0..2, ambient (die) word in 2..4,
/// both little-endian.
pub const PAYLOAD_LEN: usize = 4;

/// Ambient temperature in whole degrees Fahrenheit, truncated toward zero.
pub fn decode_ambient_fahrenheit(payload: &[u8]) -> Result<Temperature, SensorError> {
    let Some(word) = payload.get(2..PAYLOAD_LEN) else {
        return Err(SensorError::Malformed(format!(
            "expected {PAYLOAD_LEN} bytes, got {}",
            payload.len()
        )));
    };
    let raw = u16::from_le_bytes([word[0], word[1]]);
    Ok(raw_to_fahrenheit(raw) as Temperature)
}

pub fn raw_to_fahrenheit(raw: u16) -> f32 {
    let celsius = (f32::from(raw) / 4.0) * 0.03125;
    celsius * (9.0 / 5.0) + 32.0
}

/// Inverse of [`raw_to_fahrenheit`], used by simulated sensor nodes.
pub fn encode_ambient_fahrenheit(temp_f: f32) -> [u8; PAYLOAD_LEN] {
    let raw = ((temp_f - 32.0) * (5.0 / 9.0) / 0.03125 * 4.0)
        .round()
        .clamp(0.0, f32::from(u16::MAX)) as u16;
    let [lo, hi] = raw.to_le_bytes();
    [0, 0, lo, hi]
}
