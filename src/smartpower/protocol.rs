//! SmartPower HID frame definitions and encoding.
//!
//! Frame structure:
//! - Frame size: 65 bytes (1 request-code byte + 64 payload bytes)
//! - Requests go out as `[NONE, code, 0...]`; responses echo the code in byte 0
//! - DATA payload: voltage, current and power as fixed-width ASCII decimals

use crate::error::{Result, SamplerError};

/// Payload size.
pub const PAYLOAD_SIZE: usize = 64;

/// Total frame size including the request-code byte.
pub const FRAME_SIZE: usize = 1 + PAYLOAD_SIZE;

/// One HID report as exchanged with the meter.
pub type Frame = [u8; FRAME_SIZE];

/// Request codes understood by the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestCode {
    None = 0x00,
    /// Voltage, current and power readings.
    Data = 0x37,
    /// Toggle the meter's own accumulation.
    StartStop = 0x80,
    /// On/off and started/stopped flags.
    Status = 0x81,
    /// Toggle the output (powers the board off if it feeds it).
    OnOff = 0x82,
    /// Firmware version string.
    Version = 0x83,
}

impl TryFrom<u8> for RequestCode {
    type Error = SamplerError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(RequestCode::None),
            0x37 => Ok(RequestCode::Data),
            0x80 => Ok(RequestCode::StartStop),
            0x81 => Ok(RequestCode::Status),
            0x82 => Ok(RequestCode::OnOff),
            0x83 => Ok(RequestCode::Version),
            other => Err(SamplerError::Protocol(format!(
                "unknown request code 0x{:02x}",
                other
            ))),
        }
    }
}

// DATA payload layout (offsets within the 64-byte payload):
// 1 pad | 5 voltage | 3 pad | 6 current | 2 pad | 5 power | 1 pad
const VOLTAGE_FIELD: (usize, usize) = (1, 5);
const CURRENT_FIELD: (usize, usize) = (9, 6);
const POWER_FIELD: (usize, usize) = (17, 5);

/// Decoded response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Status { started: bool, on: bool },
    /// Volts, amperes and watts.
    Data {
        voltage: f64,
        current: f64,
        power: f64,
    },
    Version(String),
}

/// Builds a request frame for `code`.
pub fn build_request(code: RequestCode) -> Frame {
    let mut frame = [0u8; FRAME_SIZE];
    frame[0] = RequestCode::None as u8;
    frame[1] = code as u8;
    frame
}

fn payload(frame: &Frame) -> &[u8] {
    &frame[1..]
}

// Each field ends at the pad byte that follows it, or earlier at a NUL.
fn parse_field(payload: &[u8], (offset, len): (usize, usize)) -> Result<f64> {
    let field = &payload[offset..offset + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    let text = std::str::from_utf8(&field[..end])
        .map_err(|e| SamplerError::Parse(format!("non-ASCII DATA field: {}", e)))?;
    text.trim()
        .parse()
        .map_err(|e| SamplerError::Parse(format!("DATA field '{}': {}", text, e)))
}

/// Decodes a response frame.
///
/// An unknown response code is a [`SamplerError::Protocol`] error; a DATA
/// field that is not a number is a [`SamplerError::Parse`] error.
pub fn parse_response(frame: &Frame) -> Result<Response> {
    let payload = payload(frame);
    match RequestCode::try_from(frame[0])? {
        RequestCode::Status => Ok(Response::Status {
            started: payload[0] & 0x01 != 0,
            on: payload[1] & 0x01 != 0,
        }),
        RequestCode::Data => Ok(Response::Data {
            voltage: parse_field(payload, VOLTAGE_FIELD)?,
            current: parse_field(payload, CURRENT_FIELD)?,
            power: parse_field(payload, POWER_FIELD)?,
        }),
        RequestCode::Version => {
            let end = payload.iter().position(|&b| b == 0).unwrap_or(PAYLOAD_SIZE);
            Ok(Response::Version(
                String::from_utf8_lossy(&payload[..end]).trim().to_string(),
            ))
        }
        other => Err(SamplerError::Protocol(format!(
            "unexpected response code {:?}",
            other
        ))),
    }
}
