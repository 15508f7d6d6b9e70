//! The standard command and inquiry catalog entries.
//!
//! Payload bytes are the VISCA command set common to Sony-compatible PTZ
//! cameras; vendor-specific extensions are out of scope.

use crate::{CameraVersion, Command, FocusMode, InquiryCommand, PowerMode};

/// Clears the device's command buffers. Sent as a handshake on connect;
/// replies with a Completion and no ACK, per the VISCA specification.
pub static IF_CLEAR: Command = Command::new("Clear Command Buffers", &[0x00, 0x01]);

pub static RESET: Command = Command::new("Reset", &[0x06, 0x05]);
pub static POWER_ON: Command = Command::new("Power On", &[0x04, 0x00, 0x02]);
pub static POWER_OFF: Command = Command::new("Power Off", &[0x04, 0x00, 0x03]);
pub static HOME: Command = Command::new("Home", &[0x06, 0x04]);

/// Power inquiry; replies `y0 50 0p FF` where `p` is the power mode.
pub static INQUIRE_POWER: InquiryCommand<PowerMode> =
    InquiryCommand::new("Power Inquiry", &[0x04, 0x00], 1, parse_power);

/// Zoom position inquiry; replies `y0 50 0p 0q 0r 0s FF` where `pqrs`
/// is a nibble-packed position in `0x0000..=0x4000`, scaled to `0.0..=1.0`.
pub static INQUIRE_ZOOM: InquiryCommand<f64> =
    InquiryCommand::new("Zoom Inquiry", &[0x04, 0x47], 4, parse_zoom);

/// Camera version inquiry; replies with vendor, model, ROM version and
/// socket count.
pub static INQUIRE_VERSION: InquiryCommand<CameraVersion> =
    InquiryCommand::new("Camera Version Inquiry", &[0x00, 0x02], 7, parse_version);

/// Focus mode inquiry; replies `y0 50 0p FF` where `p` is the focus mode.
pub static INQUIRE_FOCUS_MODE: InquiryCommand<FocusMode> =
    InquiryCommand::new("Focus Mode Inquiry", &[0x04, 0x38], 1, parse_focus_mode);

fn parse_power(payload: &[u8]) -> Option<PowerMode> {
    match payload[0] {
        0x02 => Some(PowerMode::On),
        0x03 => Some(PowerMode::Standby),
        p => {
            error!("invalid power result '{p:#04x}' received");
            None
        }
    }
}

fn parse_focus_mode(payload: &[u8]) -> Option<FocusMode> {
    match payload[0] {
        0x02 => Some(FocusMode::Auto),
        0x03 => Some(FocusMode::Manual),
        p => {
            error!("invalid focus mode result '{p:#04x}' received");
            None
        }
    }
}

fn parse_zoom(payload: &[u8]) -> Option<f64> {
    let (b1, b2, b3, b4) = (payload[0], payload[1], payload[2], payload[3]);

    // Position data travels in the low nibbles only.
    if (b1 | b2 | b3 | b4) & 0xF0 != 0 {
        error!("invalid zoom data received in MSBs: {b1:#04x} {b2:#04x} {b3:#04x} {b4:#04x}");
        return None;
    }

    let raw = (u16::from(b1) << 12) | (u16::from(b2) << 8) | (u16::from(b3) << 4) | u16::from(b4);
    if raw > 0x4000 {
        warn!("invalid zoom position '{raw:#06x}' > '0x4000' received");
        return Some(1.0);
    }

    Some(f64::from(raw) / f64::from(0x4000))
}

fn parse_version(payload: &[u8]) -> Option<CameraVersion> {
    Some(CameraVersion {
        vendor: u16::from_be_bytes([payload[0], payload[1]]),
        model: u16::from_be_bytes([payload[2], payload[3]]),
        rom_version: u16::from_be_bytes([payload[4], payload[5]]),
        socket_count: payload[6],
    })
}
