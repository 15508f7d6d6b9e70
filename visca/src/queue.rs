use crate::OpContext;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::{
    sync::{oneshot, Notify, OwnedSemaphorePermit, Semaphore},
    time::Instant,
};
use visca_protocol::{Command, Response};

/// Outcome delivered to the caller that queued a command.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The transport finished the exchange.
    Completed {
        response: Response,
        /// Raw inquiry answer payload, when one was received.
        payload: Option<Vec<u8>>,
    },
    /// The command was dropped before (or instead of) an exchange.
    Canceled,
}

/// A queued command awaiting dispatch.
pub(crate) struct Pending {
    pub command: Command,
    /// Absolute budget covering queue wait plus the exchange.
    pub deadline: Instant,
    /// The caller's context; trips when they give up.
    pub ctx: OpContext,
    /// Whether the caller wants the raw inquiry payload back.
    pub wants_payload: bool,
    responder: oneshot::Sender<Outcome>,
    _slot: OwnedSemaphorePermit,
}

impl Pending {
    /// Whether the caller has given up on this entry.
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed() || self.ctx.is_canceled() || Instant::now() >= self.deadline
    }

    pub fn resolve(self, outcome: Outcome) {
        // The caller may have stopped listening; that is not an error.
        let _ = self.responder.send(outcome);
    }

    pub fn cancel(self) {
        self.resolve(Outcome::Canceled);
    }
}

/// Bounded FIFO of commands awaiting the dispatch loop.
///
/// Capacity is enforced with a semaphore, so a full queue blocks
/// enqueuers instead of erroring, and entries remain drainable from the
/// caller side for cancellation.
pub(crate) struct CommandQueue {
    entries: Mutex<VecDeque<Pending>>,
    slots: Arc<Semaphore>,
    ready: Notify,
}

impl CommandQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(depth)),
            slots: Arc::new(Semaphore::new(depth)),
            ready: Notify::new(),
        }
    }

    /// Queues a command, waiting for a slot when the queue is full.
    /// Returns the receiver the outcome will arrive on.
    pub async fn push(
        &self,
        command: Command,
        deadline: Instant,
        ctx: OpContext,
        wants_payload: bool,
    ) -> crate::Result<oneshot::Receiver<Outcome>> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| crate::Error::Closed)?;

        let (tx, rx) = oneshot::channel();
        self.entries.lock().unwrap().push_back(Pending {
            command,
            deadline,
            ctx,
            wants_payload,
            responder: tx,
            _slot: slot,
        });
        self.ready.notify_one();
        Ok(rx)
    }

    /// Takes the oldest entry, waiting for one to arrive.
    pub async fn pop(&self) -> Pending {
        loop {
            if let Some(entry) = self.entries.lock().unwrap().pop_front() {
                return entry;
            }
            self.ready.notified().await;
        }
    }

    /// Empties the queue, returning everything that was waiting.
    pub fn drain(&self) -> Vec<Pending> {
        self.entries.lock().unwrap().drain(..).collect()
    }

    /// Stops accepting new entries. Queued entries remain drainable.
    pub fn close(&self) {
        self.slots.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use visca_protocol::commands::{HOME, POWER_ON, RESET};

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(20)
    }

    async fn push(queue: &CommandQueue, command: Command) -> oneshot::Receiver<Outcome> {
        queue
            .push(command, deadline(), OpContext::unbounded(), false)
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn pops_in_fifo_order() {
        let queue = CommandQueue::new(4);
        push(&queue, HOME).await;
        push(&queue, RESET).await;
        push(&queue, POWER_ON).await;

        assert_eq!("Home", queue.pop().await.command.name());
        assert_eq!("Reset", queue.pop().await.command.name());
        assert_eq!("Power On", queue.pop().await.command.name());
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_push_until_a_slot_frees() {
        let queue = CommandQueue::new(2);
        push(&queue, HOME).await;
        push(&queue, RESET).await;

        let blocked = queue.push(POWER_ON, deadline(), OpContext::unbounded(), false);
        assert!(timeout(Duration::from_millis(10), blocked).await.is_err());

        // Dropping a popped entry releases its slot.
        drop(queue.pop().await);
        timeout(Duration::from_millis(10), push(&queue, POWER_ON))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn drained_entries_resolve_as_canceled() {
        let queue = CommandQueue::new(4);
        let rx = push(&queue, HOME).await;
        push(&queue, RESET).await;

        let drained = queue.drain();
        assert_eq!(2, drained.len());
        for entry in drained {
            entry.cancel();
        }
        assert!(matches!(rx.await, Ok(Outcome::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_rejects_pushes() {
        let queue = CommandQueue::new(4);
        queue.close();
        assert!(matches!(
            queue
                .push(HOME, deadline(), OpContext::unbounded(), false)
                .await,
            Err(crate::Error::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn abandonment_tracks_caller_context() {
        let queue = CommandQueue::new(4);
        let token = tokio_util::sync::CancellationToken::new();
        // Keep the receiver alive: a dropped receiver alone marks the
        // entry abandoned.
        let _rx = queue
            .push(HOME, deadline(), OpContext::new(token.clone()), false)
            .await
            .unwrap();

        let entry = queue.pop().await;
        assert!(!entry.is_abandoned());
        token.cancel();
        assert!(entry.is_abandoned());

        let rx = queue
            .push(RESET, deadline(), OpContext::unbounded(), false)
            .await
            .unwrap();
        drop(rx);
        assert!(queue.pop().await.is_abandoned());
    }
}
