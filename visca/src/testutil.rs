//! Shared test fixtures.

use crate::{InquiryReply, OpContext, Transport};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::field::{Field, Visit};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, Layer, Registry};
use visca_protocol::{Command, Response, ResponseKind};

pub(crate) use tracing::Level;

/// The events recorded while a [`capture`] guard was live.
#[derive(Debug, Clone)]
pub(crate) struct Logs(Arc<Mutex<Vec<(Level, String)>>>);

impl Logs {
    /// Asserts that an event with exactly this level and message was
    /// recorded.
    #[track_caller]
    pub fn expect(&self, level: Level, message: &str) {
        let entries = self.0.lock().unwrap();
        assert!(
            entries.iter().any(|(l, m)| *l == level && m == message),
            "no {level} event '{message}' among {entries:?}"
        );
    }
}

struct CaptureLayer(Arc<Mutex<Vec<(Level, String)>>>);

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), message));
        }
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

/// Installs a thread-default subscriber recording every event until the
/// guard drops. Works across awaits on a current-thread test runtime.
pub(crate) fn capture() -> (Logs, tracing::subscriber::DefaultGuard) {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(CaptureLayer(entries.clone()));
    (Logs(entries), tracing::subscriber::set_default(subscriber))
}

/// An in-memory camera that always answers, after an optional delay.
///
/// Commands complete, known inquiries answer canned payloads, and the
/// names of everything sent are recorded in order.
pub(crate) struct FakeTransport {
    state_tx: watch::Sender<bool>,
    pub sent: Arc<Mutex<Vec<&'static str>>>,
    pub latency: Duration,
    /// Connection attempts that fail before one succeeds.
    pub failed_connects: AtomicUsize,
}

pub(crate) const FAKE_VERSION_PAYLOAD: [u8; 7] = [0x00, 0x20, 0x04, 0x2B, 0x01, 0x14, 0x02];

impl FakeTransport {
    pub fn new(latency: Duration) -> Self {
        let (state_tx, _) = watch::channel(false);
        Self {
            state_tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            latency,
            failed_connects: AtomicUsize::new(0),
        }
    }
}

impl Transport for FakeTransport {
    async fn connect(&self, _ctx: OpContext) -> bool {
        if self
            .failed_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return false;
        }
        self.state_tx.send_replace(true);
        true
    }

    async fn send(&self, command: Command, _ctx: OpContext) -> Response {
        tokio::time::sleep(self.latency).await;
        self.sent.lock().unwrap().push(command.name());
        Response::new(ResponseKind::Completion, 1, 1)
    }

    async fn send_inquiry(&self, command: Command, _ctx: OpContext) -> InquiryReply {
        tokio::time::sleep(self.latency).await;
        self.sent.lock().unwrap().push(command.name());
        let payload = match command.name() {
            "Power Inquiry" => vec![0x02],
            "Camera Version Inquiry" => FAKE_VERSION_PAYLOAD.to_vec(),
            "Zoom Inquiry" => vec![0x02, 0x00, 0x00, 0x00],
            "Focus Mode Inquiry" => vec![0x02],
            _ => return InquiryReply::invalid(Response::UNKNOWN),
        };
        InquiryReply {
            response: Response::new(ResponseKind::Inquiry, 1, 0),
            payload: Some(payload),
        }
    }

    fn connection_state(&self) -> watch::Receiver<bool> {
        self.state_tx.subscribe()
    }
}
