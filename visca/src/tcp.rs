use crate::{CameraConfig, Error, InquiryReply, OpContext, Result, Transport};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{watch, Mutex},
};
use visca_protocol::{commands, Command, CommandKind, Response, ResponseKind, TERMINATOR};

/// Largest message in the standard catalog. The send buffer starts at
/// this size and grows, with a warning, for anything bigger.
const SEND_BUFFER_LEN: usize = 16;

const READ_CHUNK_LEN: usize = 64;

/// VISCA over a TCP stream.
///
/// One exchange at a time: the inner mutex spans the whole
/// write→ACK→Completion cycle, so replies can never interleave between
/// commands. Bytes that arrive beyond a reply's terminator are kept for
/// the next read, as devices are free to coalesce the ACK and the
/// Completion into one segment.
///
/// IO failures and timeouts tear the stream down, flip the connection
/// state to `false` and surface as `Unknown` responses; the next send
/// attempts to reconnect first.
pub struct TcpTransport {
    addr: SocketAddr,
    name: String,
    device_id: u8,
    max_timeout: Duration,
    connect_timeout: Duration,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<bool>,
}

struct Inner {
    stream: Option<TcpStream>,
    /// Reusable encode buffer.
    tx: Vec<u8>,
    /// Bytes received beyond the last framed reply.
    rx: Vec<u8>,
}

impl TcpTransport {
    pub fn new(config: &CameraConfig) -> Self {
        let (state_tx, _) = watch::channel(false);
        Self {
            addr: config.addr,
            name: config.display_name(),
            device_id: config.device_id,
            max_timeout: config.max_timeout,
            connect_timeout: config.connect_timeout,
            inner: Mutex::new(Inner {
                stream: None,
                tx: vec![0; SEND_BUFFER_LEN],
                rx: Vec::new(),
            }),
            state_tx,
        }
    }

    fn mark_disconnected(&self, inner: &mut Inner) {
        inner.stream = None;
        inner.rx.clear();
        self.state_tx.send_replace(false);
    }

    /// Connects and clears the device's command buffers. The caller
    /// holds the lock.
    async fn establish(&self, inner: &mut Inner, ctx: &OpContext) -> bool {
        self.mark_disconnected(inner);
        let ctx = ctx.with_timeout(self.connect_timeout);

        let stream = match ctx.run(TcpStream::connect(self.addr)).await {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                error!("could not connect to '{}' ({}): {e}", self.name, self.addr);
                return false;
            }
            None => {
                error!(
                    "connection attempt to '{}' ({}) timed out",
                    self.name, self.addr
                );
                return false;
            }
        };
        inner.stream = Some(stream);
        debug!("connected to '{}' ({}), clearing command buffers", self.name, self.addr);

        // The handshake confirms something VISCA-shaped is on the other
        // end; IFClear completes without an ACK.
        let response = match self.exchange(inner, &commands::IF_CLEAR, &ctx).await {
            Ok((response, _)) => response,
            Err(e) => {
                error!("could not clear command buffers of '{}': {e}", self.name);
                self.mark_disconnected(inner);
                return false;
            }
        };
        if response.kind == ResponseKind::Unknown {
            error!("'{}' did not answer the buffer clear, closing", self.name);
            self.mark_disconnected(inner);
            return false;
        }
        if response.kind != ResponseKind::Completion {
            warn!(
                "'{}' answered the buffer clear with '{}' instead of '{}'",
                self.name,
                response.kind,
                ResponseKind::Completion
            );
        }

        info!("connected to '{}' ({})", self.name, self.addr);
        self.state_tx.send_replace(true);
        true
    }

    /// Drives one full command cycle on the locked stream: write, then
    /// one reply for inquiries and cancels, or ACK then Completion for
    /// commands.
    async fn exchange(
        &self,
        inner: &mut Inner,
        command: &Command,
        ctx: &OpContext,
    ) -> Result<(Response, Option<Vec<u8>>)> {
        let len = command.message_len();
        if len > inner.tx.len() {
            warn!(
                "growing the send buffer to {len} bytes for '{}'",
                command.name()
            );
            inner.tx.resize(len, 0);
        }
        let len = command.write_message(&mut inner.tx, self.device_id)?;

        let Inner { stream, tx, rx } = inner;
        let stream = stream
            .as_mut()
            .ok_or_else(|| Error::IoError(std::io::ErrorKind::NotConnected.into()))?;

        trace!("sending '{}' to '{}'", command.name(), self.name);
        run_io(ctx, stream.write_all(&tx[..len])).await?;

        let mut ack_socket = None;
        if command.kind() == CommandKind::Command {
            let reply = read_reply(stream, rx, ctx).await?;
            let response = command.decode_response(&reply);
            if response.kind != ResponseKind::Ack {
                // Any non-ACK first reply is final; IFClear legitimately
                // completes without an ACK.
                if *command != commands::IF_CLEAR || response.kind != ResponseKind::Completion {
                    warn!(
                        "received '{}' response whilst executing '{}' instead of an 'Ack'",
                        response.kind,
                        command.name()
                    );
                }
                return Ok((response, None));
            }
            ack_socket = Some(response.socket);
        }

        let reply = read_reply(stream, rx, ctx).await?;
        let response = command.decode_response(&reply);
        if response.kind != ResponseKind::Unknown && response.device_id != self.device_id {
            warn!(
                "'{}' answered as device {} instead of {}",
                self.name, response.device_id, self.device_id
            );
        }
        if let Some(socket) = ack_socket {
            if response.kind == ResponseKind::Completion && response.socket != socket {
                warn!(
                    "'{}' completed on socket {} after acknowledging on socket {}",
                    command.name(),
                    response.socket,
                    socket
                );
            }
        }

        let payload =
            (response.kind == ResponseKind::Inquiry).then(|| reply[2..reply.len() - 1].to_vec());
        Ok((response, payload))
    }

    async fn send_framed(&self, command: Command, ctx: OpContext) -> (Response, Option<Vec<u8>>) {
        let ctx = ctx.with_timeout(self.max_timeout);
        let Some(mut inner) = ctx.run(self.inner.lock()).await else {
            error!(
                "gave up waiting to send '{}' to '{}'",
                command.name(),
                self.name
            );
            return (command.unknown_response(), None);
        };

        if inner.stream.is_none() && !self.establish(&mut inner, &ctx).await {
            error!(
                "could not send '{}' to '{}': no connection",
                command.name(),
                self.name
            );
            return (command.unknown_response(), None);
        }

        match self.exchange(&mut inner, &command, &ctx).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "exchange of '{}' with '{}' failed: {e}",
                    command.name(),
                    self.name
                );
                self.mark_disconnected(&mut inner);
                (command.unknown_response(), None)
            }
        }
    }
}

impl Transport for TcpTransport {
    async fn connect(&self, ctx: OpContext) -> bool {
        let Some(mut inner) = ctx.run(self.inner.lock()).await else {
            return false;
        };
        if inner.stream.is_some() && self.is_connected() {
            return true;
        }
        self.establish(&mut inner, &ctx).await
    }

    async fn send(&self, command: Command, ctx: OpContext) -> Response {
        self.send_framed(command, ctx).await.0
    }

    async fn send_inquiry(&self, command: Command, ctx: OpContext) -> InquiryReply {
        let (response, payload) = self.send_framed(command, ctx).await;
        InquiryReply { response, payload }
    }

    fn connection_state(&self) -> watch::Receiver<bool> {
        self.state_tx.subscribe()
    }
}

async fn run_io<T>(
    ctx: &OpContext,
    fut: impl std::future::Future<Output = std::io::Result<T>>,
) -> Result<T> {
    match ctx.run(fut).await {
        Some(result) => Ok(result?),
        None => Err(Error::IoError(std::io::ErrorKind::TimedOut.into())),
    }
}

/// Reads one terminator-framed reply, keeping any bytes that arrive
/// beyond it for the next call.
async fn read_reply(stream: &mut TcpStream, rx: &mut Vec<u8>, ctx: &OpContext) -> Result<Vec<u8>> {
    loop {
        if let Some(pos) = rx.iter().position(|&b| b == TERMINATOR) {
            return Ok(rx.drain(..=pos).collect());
        }

        let mut chunk = [0u8; READ_CHUNK_LEN];
        let n = run_io(ctx, stream.read(&mut chunk)).await?;
        if n == 0 {
            return Err(Error::IoError(std::io::ErrorKind::UnexpectedEof.into()));
        }
        rx.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil;
    use tokio::{net::TcpListener, task::JoinHandle};

    /// A scripted camera: reads one request per scripted reply, then
    /// writes that reply (which may hold several coalesced messages),
    /// then closes. Returns the raw requests it received.
    async fn scripted_camera(replies: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut requests = Vec::new();
            for reply in replies {
                let mut request = Vec::new();
                let mut byte = [0u8; 1];
                loop {
                    stream.read_exact(&mut byte).await.unwrap();
                    request.push(byte[0]);
                    if byte[0] == TERMINATOR {
                        break;
                    }
                }
                requests.push(request);
                stream.write_all(&reply).await.unwrap();
            }
            requests
        });
        (addr, handle)
    }

    fn transport(addr: SocketAddr) -> TcpTransport {
        TcpTransport::new(&CameraConfig::new(addr))
    }

    #[tokio::test]
    async fn connect_clears_command_buffers() {
        let (addr, camera) = scripted_camera(vec![hex::decode("9050ff").unwrap()]).await;
        let transport = transport(addr);

        assert!(transport.connect(OpContext::unbounded()).await);
        assert!(transport.is_connected());
        assert_eq!(
            vec![hex::decode("81010001ff").unwrap()],
            camera.await.unwrap()
        );
    }

    #[tokio::test]
    async fn command_handshake_ack_then_completion() {
        // The camera coalesces the ACK and the Completion into one
        // segment; the framer must split them.
        let (addr, camera) = scripted_camera(vec![
            hex::decode("9050ff").unwrap(),
            hex::decode("9041ff9051ff").unwrap(),
        ])
        .await;
        let transport = transport(addr);
        assert!(transport.connect(OpContext::unbounded()).await);

        let response = transport
            .send(commands::HOME, OpContext::unbounded())
            .await;
        assert_eq!(Response::new(ResponseKind::Completion, 1, 1), response);
        assert_eq!(
            vec![
                hex::decode("81010001ff").unwrap(),
                hex::decode("81010604ff").unwrap(),
            ],
            camera.await.unwrap()
        );
    }

    #[tokio::test]
    async fn command_error_reply_warns_and_is_final() {
        let (addr, _camera) = scripted_camera(vec![
            hex::decode("9050ff").unwrap(),
            hex::decode("906002ff").unwrap(),
        ])
        .await;
        let transport = transport(addr);
        assert!(transport.connect(OpContext::unbounded()).await);

        let (logs, _guard) = testutil::capture();
        let response = transport
            .send(commands::HOME, OpContext::unbounded())
            .await;
        assert_eq!(Response::new(ResponseKind::SyntaxError, 1, 0), response);
        // An error reply is not an IO failure; the link stays up.
        assert!(transport.is_connected());
        logs.expect(
            testutil::Level::WARN,
            "received 'SyntaxError' response whilst executing 'Home' instead of an 'Ack'",
        );
    }

    #[tokio::test]
    async fn inquiry_returns_raw_payload() {
        let (addr, camera) = scripted_camera(vec![
            hex::decode("9050ff").unwrap(),
            hex::decode("905002ff").unwrap(),
        ])
        .await;
        let transport = transport(addr);
        assert!(transport.connect(OpContext::unbounded()).await);

        let reply = transport
            .send_inquiry(*commands::INQUIRE_POWER.command(), OpContext::unbounded())
            .await;
        assert_eq!(Response::new(ResponseKind::Inquiry, 1, 0), reply.response);
        assert_eq!(Some(vec![0x02]), reply.payload);
        assert_eq!(
            vec![
                hex::decode("81010001ff").unwrap(),
                hex::decode("81090400ff").unwrap(),
            ],
            camera.await.unwrap()
        );
    }

    #[tokio::test]
    async fn refused_connection_fails_cleanly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = transport(addr);
        assert!(!transport.connect(OpContext::unbounded()).await);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn peer_closing_mid_exchange_degrades_to_unknown() {
        // One scripted reply: the handshake succeeds, then the camera
        // closes before answering the command.
        let (addr, _camera) = scripted_camera(vec![hex::decode("9050ff").unwrap()]).await;
        let transport = transport(addr);
        assert!(transport.connect(OpContext::unbounded()).await);

        let response = transport
            .send(commands::HOME, OpContext::unbounded())
            .await;
        assert_eq!(ResponseKind::Unknown, response.kind);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn silent_peer_fails_the_handshake() {
        let (addr, _camera) = scripted_camera(vec![]).await;
        let transport = transport(addr);
        assert!(!transport.connect(OpContext::unbounded()).await);
        assert!(!transport.is_connected());
    }
}
