//! Captures tracing events so tests can assert decode diagnostics.

use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, Layer, Registry};

pub use tracing::Level;

/// The events recorded while a [`capture`] closure ran.
#[derive(Debug, Clone)]
pub struct Logs(Arc<Mutex<Vec<(Level, String)>>>);

impl Logs {
    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

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

/// Runs `f` with a scoped subscriber that records every event.
pub fn capture<R>(f: impl FnOnce() -> R) -> (Logs, R) {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(CaptureLayer(entries.clone()));
    let r = tracing::subscriber::with_default(subscriber, f);
    (Logs(entries), r)
}
