use crate::{Error, Response, ResponseKind, Result};
use num_traits::FromPrimitive;

/// Every VISCA message ends with this byte.
pub const TERMINATOR: u8 = 0xFF;

/// Type byte base for cancel messages; the target socket is packed into
/// the low nibble.
pub const CANCEL_TYPE_BASE: u8 = 0x20;

/// The kind of a [`Command`], which doubles as the message type byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CommandKind {
    /// An action command; replied to with ACK then Completion.
    Command,
    /// A read-only query; replied to with a single payload-carrying reply.
    Inquiry,
    /// Cancels the outstanding command on `socket`.
    Cancel { socket: u8 },
}

impl CommandKind {
    /// The second byte of the encoded message.
    pub const fn type_byte(&self) -> u8 {
        match self {
            CommandKind::Command => 0x01,
            CommandKind::Inquiry => 0x09,
            CommandKind::Cancel { socket } => CANCEL_TYPE_BASE + *socket,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Command => f.write_str("Command"),
            CommandKind::Inquiry => f.write_str("Inquiry"),
            CommandKind::Cancel { .. } => f.write_str("Cancel"),
        }
    }
}

/// A named VISCA command with a fixed payload.
///
/// Commands are immutable and registered once; see
/// [`CommandCatalog`][crate::CommandCatalog] for the standard set. The
/// interesting work lives in [`write_message`][Self::write_message]
/// (encoding) and [`decode_response`][Self::decode_response]
/// (classification of raw reply buffers).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Command {
    name: &'static str,
    kind: CommandKind,
    payload: &'static [u8],
}

impl Command {
    pub const fn new(name: &'static str, payload: &'static [u8]) -> Self {
        Self {
            name,
            kind: CommandKind::Command,
            payload,
        }
    }

    pub(crate) const fn with_kind(
        name: &'static str,
        kind: CommandKind,
        payload: &'static [u8],
    ) -> Self {
        Self {
            name,
            kind,
            payload,
        }
    }

    /// A cancel command targeting `socket` (`0x0..=0xf`).
    ///
    /// The socket travels in the low nibble of the type byte, not in the
    /// payload.
    pub fn cancel(socket: u8) -> Result<Self> {
        if socket > 0xF {
            return Err(Error::SocketOutOfRange(socket));
        }

        Ok(Self {
            name: "Cancel",
            kind: CommandKind::Cancel { socket },
            payload: &[],
        })
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    pub const fn payload(&self) -> &'static [u8] {
        self.payload
    }

    /// Length of the encoded message: header, type byte, payload,
    /// terminator.
    pub const fn message_len(&self) -> usize {
        self.payload.len() + 3
    }

    /// The canonical response for this command when no usable reply was
    /// obtained.
    pub fn unknown_response(&self) -> Response {
        Response::UNKNOWN
    }

    /// Encodes the command into `buf`, returning the number of bytes
    /// written (always [`message_len`][Self::message_len]).
    ///
    /// Referentially transparent; performs no I/O.
    pub fn write_message(&self, buf: &mut [u8], device_id: u8) -> Result<usize> {
        if device_id > 7 {
            return Err(Error::DeviceIdOutOfRange(device_id));
        }

        let len = self.message_len();
        if buf.len() < len {
            return Err(Error::BufferTooSmall {
                need: len,
                have: buf.len(),
            });
        }

        buf[0] = 0x80 + device_id;
        buf[1] = self.kind.type_byte();
        buf[2..len - 1].copy_from_slice(self.payload);
        buf[len - 1] = TERMINATOR;
        Ok(len)
    }

    /// Encodes the command into a fresh buffer.
    pub fn to_message(&self, device_id: u8) -> Result<Vec<u8>> {
        let mut buf = vec![0; self.message_len()];
        self.write_message(&mut buf, device_id)?;
        Ok(buf)
    }

    /// Classifies a raw reply buffer against this command.
    ///
    /// `buf` is a window over a possibly larger receive buffer, framed by
    /// the caller on the trailing [`TERMINATOR`]. Malformed input is never
    /// an error: each failure is logged and degrades to an `Unknown`
    /// response carrying whatever device id and socket were recovered
    /// before the failure.
    pub fn decode_response(&self, buf: &[u8]) -> Response {
        let len = buf.len();
        if len < 1 {
            error!("response was empty");
            return Response::UNKNOWN;
        }

        let b0 = buf[0];
        if b0 & 0xF > 0 {
            error!("response device byte '{b0:#04x}' was invalid");
            return Response::UNKNOWN;
        }

        // Device ids on the wire are biased by +8.
        let device_id = i16::from(b0 >> 4) - 8;
        if device_id < 1 {
            error!("response device id '{device_id}' was invalid, as it must be greater than 0");
            return Response::UNKNOWN;
        }
        let device_id = device_id as u8;

        if len < 2 {
            error!("response length '{len}' was too short");
            return Response::new(ResponseKind::Unknown, device_id, 0);
        }

        let b1 = buf[1];
        let socket = b1 & 0xF;

        if len < 3 {
            error!("response length '{len}' was too short");
            return Response::new(ResponseKind::Unknown, device_id, socket);
        }

        let end = buf[len - 1];
        if end != TERMINATOR {
            error!("response last byte '{end:#04x}' was not a termination");
            return Response::new(ResponseKind::Unknown, device_id, socket);
        }

        let kind = if b1 & 0xF0 == 0x50 {
            // A 0x5p reply is a Completion when the third byte already
            // terminates the message, otherwise it carries inquiry
            // payload.
            if buf[2] == TERMINATOR {
                ResponseKind::Completion
            } else {
                if self.kind != CommandKind::Inquiry {
                    error!(
                        "'{}' response was not expected for the '{}' type",
                        ResponseKind::Inquiry,
                        self.kind
                    );
                    return Response::new(ResponseKind::Unknown, device_id, socket);
                }
                ResponseKind::Inquiry
            }
        } else {
            let lookahead = (u16::from(b1 & 0xF0) << 8) | u16::from(buf[2]);
            match ResponseKind::from_u16(lookahead) {
                Some(kind) => kind,
                None => {
                    error!("response type '{lookahead:#06x}' is unknown");
                    return Response::new(ResponseKind::Unknown, device_id, socket);
                }
            }
        };

        match len {
            3 => match kind {
                ResponseKind::Ack | ResponseKind::Completion => {
                    if !matches!(self.kind, CommandKind::Command) {
                        error!(
                            "'{kind}' response was not expected for the '{}' type",
                            self.kind
                        );
                        return Response::new(ResponseKind::Unknown, device_id, socket);
                    }

                    Response::new(kind, device_id, socket)
                }
                // Unreachable: only 0x40FF and 0x50FF can classify at
                // this length, since byte 2 is the terminator.
                _ => {
                    error!("response length '{len}' was too short for type '{kind}'");
                    Response::new(ResponseKind::Unknown, device_id, socket)
                }
            },
            4 => match kind {
                ResponseKind::SyntaxError | ResponseKind::BufferFull | ResponseKind::Inquiry => {
                    if socket != 0 {
                        warn!(
                            "'{kind}' response should not specify a socket, but specified '{socket}'"
                        );
                    }

                    Response::new(kind, device_id, 0)
                }
                ResponseKind::MessageLengthError
                | ResponseKind::NoSocket
                | ResponseKind::NotExecutable => Response::new(kind, device_id, socket),
                ResponseKind::Canceled => {
                    if !matches!(self.kind, CommandKind::Cancel { .. }) {
                        error!(
                            "'{kind}' response was not expected for the '{}' type",
                            self.kind
                        );
                        return Response::new(ResponseKind::Unknown, device_id, socket);
                    }

                    Response::new(kind, device_id, socket)
                }
                _ => {
                    error!("response length '{len}' was invalid for type '{kind}'");
                    Response::new(ResponseKind::Unknown, device_id, socket)
                }
            },
            _ => {
                // Only inquiries reply with more than 4 bytes.
                if kind != ResponseKind::Inquiry {
                    error!("response length '{len}' was invalid for type '{kind}'");
                    return Response::new(ResponseKind::Unknown, device_id, socket);
                }

                Response::new(ResponseKind::Inquiry, device_id, socket)
            }
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CommandKind::Cancel { socket } => write!(f, "{} (socket {socket})", self.name),
            _ => f.write_str(self.name),
        }
    }
}
