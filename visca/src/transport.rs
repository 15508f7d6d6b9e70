use crate::OpContext;
use std::future::Future;
use tokio::sync::watch;
use visca_protocol::{Command, Response};

/// A reply to an inquiry: the classified response plus the raw answer
/// payload (header and terminator stripped) when one was received.
///
/// The payload travels untyped so transports stay monomorphic; the
/// caller decodes it with the
/// [`InquiryCommand`][visca_protocol::InquiryCommand] it sent.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InquiryReply {
    pub response: Response,
    pub payload: Option<Vec<u8>>,
}

impl InquiryReply {
    /// A reply that classified as something other than an inquiry
    /// answer.
    pub fn invalid(response: Response) -> Self {
        Self {
            response,
            payload: None,
        }
    }
}

/// One camera link, carrying a single exchange at a time.
///
/// Callers serialize through [`CameraConnection`][crate::CameraConnection]'s
/// queue; implementations must still guard against overlap so replies
/// can never interleave. Transports do not fail with errors: any IO
/// problem or timeout is logged and degrades to an `Unknown` response,
/// and the connection state channel flips to `false`.
pub trait Transport: Send + Sync + 'static {
    /// Establishes the link, performing any handshake the wire needs.
    /// Returns whether the transport is ready to carry commands.
    fn connect(&self, ctx: OpContext) -> impl Future<Output = bool> + Send;

    /// Sends a command or cancel and drives its full reply cycle.
    fn send(&self, command: Command, ctx: OpContext) -> impl Future<Output = Response> + Send;

    /// Sends an inquiry, returning the classified reply and its raw
    /// answer payload.
    fn send_inquiry(
        &self,
        command: Command,
        ctx: OpContext,
    ) -> impl Future<Output = InquiryReply> + Send;

    /// Watch channel carrying the link state; `true` while connected.
    fn connection_state(&self) -> watch::Receiver<bool>;

    fn is_connected(&self) -> bool {
        *self.connection_state().borrow()
    }
}
