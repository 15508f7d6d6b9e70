/// The classification of a single reply message from a VISCA device.
///
/// The discriminant values are the 16-bit lookahead used by the decoder:
/// the high byte is the reply's second byte with the socket nibble masked
/// off, the low byte is the reply's third byte. The two 3-byte replies
/// (ACK and Completion) use `0xFF` (the terminator) as their low byte, and
/// an inquiry reply carries payload there, so `Inquiry` is a placeholder
/// value that never matches the table directly.
#[derive(FromPrimitive, Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u16)]
pub enum ResponseKind {
    /// The reply could not be classified.
    #[default]
    Unknown = 0xFFFF,

    /// Acknowledgement; the command was accepted and is executing. A
    /// Completion follows on the same socket.
    Ack = 0x40FF,

    /// Completion carrying an inquiry's answer payload.
    Inquiry = 0x5000,

    /// The command finished executing.
    Completion = 0x50FF,

    MessageLengthError = 0x6001,
    SyntaxError = 0x6002,
    BufferFull = 0x6003,

    /// A command on the addressed socket was canceled.
    Canceled = 0x6004,

    /// No command is executing on the addressed socket.
    NoSocket = 0x6005,

    /// The device cannot execute the command in its current mode.
    NotExecutable = 0x6041,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A classified, validated reply from a VISCA device.
///
/// Plain value type compared by field equality; decoding the same bytes
/// twice yields equal responses.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Response {
    pub kind: ResponseKind,
    /// Device address, `0..=7`.
    pub device_id: u8,
    /// Socket (buffer slot) correlating ACK and Completion, `0..=15`.
    pub socket: u8,
}

impl Response {
    /// The reply was completely unknown (not even a device id could be
    /// recovered).
    pub const UNKNOWN: Response = Response {
        kind: ResponseKind::Unknown,
        device_id: 0,
        socket: 0,
    };

    pub const fn new(kind: ResponseKind, device_id: u8, socket: u8) -> Self {
        Self {
            kind,
            device_id,
            socket,
        }
    }

    /// Whether this reply terminates a command successfully.
    ///
    /// ACK is never valid on its own; it precedes a Completion.
    pub fn is_valid(&self) -> bool {
        matches!(self.kind, ResponseKind::Completion | ResponseKind::Canceled)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (device {}, socket {})",
            self.kind, self.device_id, self.socket
        )
    }
}

/// A reply to an [`InquiryCommand<T>`][crate::InquiryCommand], carrying the
/// decoded answer when `response.kind` is [`ResponseKind::Inquiry`].
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct InquiryResponse<T> {
    pub response: Response,
    /// The decoded payload; `None` unless the reply classified as a valid
    /// inquiry answer and the payload parsed.
    pub result: Option<T>,
}

impl<T> InquiryResponse<T> {
    /// A reply that classified as something other than a valid inquiry
    /// answer; carries no result.
    pub const fn invalid(response: Response) -> Self {
        Self {
            response,
            result: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.response.kind == crate::ResponseKind::Inquiry && self.result.is_some()
    }
}
