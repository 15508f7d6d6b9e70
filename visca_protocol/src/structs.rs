//! Typed inquiry payload values.

/// Camera power state, as reported by the power inquiry.
#[derive(FromPrimitive, Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
pub enum PowerMode {
    On = 0x02,
    /// Standby doubles as "off" on most devices.
    Standby = 0x03,
    #[default]
    Unknown = 0xFF,
}

impl std::fmt::Display for PowerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Focus drive mode, as reported by the focus mode inquiry.
#[derive(FromPrimitive, Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
pub enum FocusMode {
    Auto = 0x02,
    Manual = 0x03,
    #[default]
    Unknown = 0xFF,
}

impl std::fmt::Display for FocusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Device identity from the version inquiry.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct CameraVersion {
    pub vendor: u16,
    pub model: u16,
    pub rom_version: u16,
    /// Number of command buffer sockets the device supports.
    pub socket_count: u8,
}

impl CameraVersion {
    pub const UNKNOWN: CameraVersion = CameraVersion {
        vendor: 0,
        model: 0,
        rom_version: 0,
        socket_count: 0,
    };
}

impl std::fmt::Display for CameraVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::UNKNOWN {
            return f.write_str("Unknown");
        }

        write!(
            f,
            "vendor {:#06x}, model {:#06x}, ROM {:#06x}, {} socket(s)",
            self.vendor, self.model, self.rom_version, self.socket_count
        )
    }
}
