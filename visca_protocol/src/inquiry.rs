use crate::{Command, CommandKind, InquiryResponse, Response, ResponseKind};

/// An inquiry command with a typed answer.
///
/// Each inquiry owns exactly one parser, registered at build time as a
/// plain function: it receives the reply payload (header and terminator
/// already stripped, length already validated) and returns `None` on
/// invalid data, logging its own diagnostic.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct InquiryCommand<T> {
    command: Command,
    payload_len: usize,
    parse: fn(&[u8]) -> Option<T>,
}

impl<T> InquiryCommand<T> {
    pub const fn new(
        name: &'static str,
        payload: &'static [u8],
        payload_len: usize,
        parse: fn(&[u8]) -> Option<T>,
    ) -> Self {
        Self {
            command: Command::with_kind(name, CommandKind::Inquiry, payload),
            payload_len,
            parse,
        }
    }

    /// The underlying wire command.
    pub const fn command(&self) -> &Command {
        &self.command
    }

    pub const fn name(&self) -> &'static str {
        self.command.name()
    }

    /// Expected reply payload length in bytes, excluding the 2 header
    /// bytes and the terminator.
    pub const fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Validates the extracted reply payload and parses it.
    pub fn parse_payload(&self, payload: &[u8]) -> Option<T> {
        if payload.len() != self.payload_len {
            error!(
                "inquiry response payload length '{}' is invalid, should be '{}'",
                payload.len(),
                self.payload_len
            );
            return None;
        }

        (self.parse)(payload)
    }

    /// Classifies a raw reply buffer and decodes the inquiry answer.
    ///
    /// Runs the base [classifier][Command::decode_response] first; any
    /// non-Inquiry outcome passes through with no result. A payload of
    /// the wrong length or one the parser rejects degrades to `Unknown`,
    /// keeping the recovered device id.
    pub fn decode_response(&self, buf: &[u8]) -> InquiryResponse<T> {
        let base = self.command.decode_response(buf);
        if base.kind != ResponseKind::Inquiry {
            return InquiryResponse::invalid(base);
        }

        // Strip the 2 header bytes and the trailing terminator.
        let payload = &buf[2..buf.len() - 1];
        match self.parse_payload(payload) {
            Some(result) => InquiryResponse {
                response: base,
                result: Some(result),
            },
            None => InquiryResponse::invalid(Response::new(
                ResponseKind::Unknown,
                base.device_id,
                0,
            )),
        }
    }
}
