use thiserror::Error;

/// Error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("device id '{0}' out of range, must be 0..=7")]
    DeviceIdOutOfRange(u8),

    #[error("socket '{0}' out of range, must be 0x0..=0xf")]
    SocketOutOfRange(u8),

    #[error("duplicate command registration: {0}")]
    DuplicateCommand(String),

    #[error("buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },
}
