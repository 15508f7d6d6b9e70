use crate::{
    queue::{CommandQueue, Outcome, Pending},
    status::{CameraStatus, ConnectionState},
    tcp::TcpTransport,
    CameraConfig, Error, OpContext, Result, Transport,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use visca_protocol::{
    commands, CameraVersion, Command, CommandCatalog, InquiryCommand, InquiryResponse, PowerMode,
    Response, ResponseKind,
};

/// A managed connection to one camera.
///
/// Commands are queued FIFO and dispatched one at a time by a
/// background task that owns the transport, reconnecting with a delay
/// whenever the link drops. The task also keeps a [`CameraStatus`]
/// snapshot current, seeding it with version and power inquiries after
/// each connect and folding in whatever later responses reveal.
pub struct CameraConnection {
    catalog: CommandCatalog,
    queue: Arc<CommandQueue>,
    status_rx: watch::Receiver<CameraStatus>,
    shutdown: CancellationToken,
    max_timeout: Duration,
    _monitor: JoinHandle<()>,
}

impl CameraConnection {
    /// Opens a TCP connection to the configured camera.
    ///
    /// Must be called from within a tokio runtime; connecting starts
    /// immediately in the background.
    pub fn open(config: CameraConfig) -> Result<Self> {
        config.validate()?;
        let transport = TcpTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Runs the connection over a caller-supplied transport.
    pub fn with_transport<T: Transport>(config: CameraConfig, transport: T) -> Result<Self> {
        config.validate()?;

        // Building the registry here surfaces duplicate command
        // registrations at construction time, not on the wire.
        let catalog = CommandCatalog::standard()?;
        let queue = Arc::new(CommandQueue::new(config.queue_depth));
        let (status_tx, status_rx) = watch::channel(CameraStatus::UNKNOWN);
        let shutdown = CancellationToken::new();
        let monitor = Monitor {
            transport,
            queue: Arc::clone(&queue),
            status_tx,
            name: config.display_name(),
            retry_delay: config.retry_delay,
            shutdown: shutdown.clone(),
        };

        Ok(Self {
            catalog,
            queue,
            status_rx,
            shutdown,
            max_timeout: config.max_timeout,
            _monitor: tokio::spawn(monitor.run()),
        })
    }

    /// The registry of known commands, built once at construction.
    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Waits until the camera is connected.
    pub async fn connect(&self, ctx: OpContext) -> Result {
        let mut status = self.status_rx.clone();
        loop {
            if status.borrow_and_update().connection == ConnectionState::Connected {
                return Ok(());
            }
            match ctx.run(status.changed()).await {
                Some(Ok(())) => (),
                Some(Err(_)) => return Err(Error::Closed),
                None => return Err(Error::Canceled),
            }
        }
    }

    /// Sends a command and waits for its final response.
    ///
    /// Canceling `ctx` while the command is still queued resolves it as
    /// [`Error::Canceled`] without ever touching the transport. Once
    /// dispatched, the exchange runs to completion on the wire and only
    /// the result delivery is dropped.
    pub async fn send(&self, command: Command, ctx: OpContext) -> Result<Response> {
        let rx = self.enqueue(command, ctx.clone(), false).await?;
        match self.outcome(rx, &ctx).await? {
            Outcome::Completed { response, .. } => Ok(response),
            Outcome::Canceled => Err(Error::Canceled),
        }
    }

    /// Sends an inquiry and decodes its typed answer.
    pub async fn send_inquiry<T>(
        &self,
        inquiry: &InquiryCommand<T>,
        ctx: OpContext,
    ) -> Result<InquiryResponse<T>> {
        let rx = self.enqueue(*inquiry.command(), ctx.clone(), true).await?;
        match self.outcome(rx, &ctx).await? {
            Outcome::Completed { response, payload } => {
                if response.kind != ResponseKind::Inquiry {
                    return Ok(InquiryResponse::invalid(response));
                }
                match payload.and_then(|p| inquiry.parse_payload(&p)) {
                    Some(result) => Ok(InquiryResponse {
                        response,
                        result: Some(result),
                    }),
                    None => Ok(InquiryResponse::invalid(Response::new(
                        ResponseKind::Unknown,
                        response.device_id,
                        0,
                    ))),
                }
            }
            Outcome::Canceled => Err(Error::Canceled),
        }
    }

    /// Cancels everything still queued, then asks the device to cancel
    /// the command executing on `socket`. The cancel itself cannot be
    /// canceled.
    pub async fn cancel_all(&self, socket: u8) -> Result<Response> {
        let drained = self.queue.drain();
        if !drained.is_empty() {
            info!("dropping {} queued commands", drained.len());
            for entry in drained {
                entry.cancel();
            }
        }

        let cancel = Command::cancel(socket)?;
        self.send(cancel, OpContext::unbounded()).await
    }

    /// The live status channel. The current snapshot is observable
    /// immediately via [`watch::Receiver::borrow`].
    pub fn status(&self) -> watch::Receiver<CameraStatus> {
        self.status_rx.clone()
    }

    pub fn current_status(&self) -> CameraStatus {
        *self.status_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.current_status().connection == ConnectionState::Connected
    }

    /// Stops the dispatch task and cancels everything queued. Idempotent.
    pub fn close(&self) {
        self.queue.close();
        self.shutdown.cancel();
        for entry in self.queue.drain() {
            entry.cancel();
        }
    }

    async fn enqueue(
        &self,
        command: Command,
        ctx: OpContext,
        wants_payload: bool,
    ) -> Result<oneshot::Receiver<Outcome>> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Closed);
        }

        // The entry's budget is the caller's deadline capped at the
        // configured per-command maximum.
        let cap = Instant::now() + self.max_timeout;
        let deadline = ctx.deadline().map_or(cap, |d| d.min(cap));

        match ctx
            .run(self.queue.push(command, deadline, ctx.clone(), wants_payload))
            .await
        {
            Some(result) => result,
            None => Err(Error::Canceled),
        }
    }

    async fn outcome(&self, rx: oneshot::Receiver<Outcome>, ctx: &OpContext) -> Result<Outcome> {
        tokio::select! {
            outcome = rx => outcome.map_err(|_| Error::ChannelUnavailable),
            () = ctx.cancelled() => Err(Error::Canceled),
        }
    }
}

impl Drop for CameraConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// The background task: owns the transport, drives the queue and keeps
/// the status snapshot current.
struct Monitor<T: Transport> {
    transport: T,
    queue: Arc<CommandQueue>,
    status_tx: watch::Sender<CameraStatus>,
    name: String,
    retry_delay: Duration,
    shutdown: CancellationToken,
}

impl<T: Transport> Monitor<T> {
    async fn run(self) {
        while !self.shutdown.is_cancelled() {
            self.publish(None, None, Some(ConnectionState::Connecting));
            let ctx = OpContext::new(self.shutdown.clone());
            if !self.transport.connect(ctx).await {
                self.publish(None, None, Some(ConnectionState::Disconnected));
                if !self.pause().await {
                    break;
                }
                continue;
            }

            self.publish(None, None, Some(ConnectionState::Connected));
            self.refresh_status().await;
            self.dispatch().await;
            if self.shutdown.is_cancelled() {
                break;
            }

            warn!("lost connection to '{}'", self.name);
            self.publish(None, None, Some(ConnectionState::Disconnected));
            if !self.pause().await {
                break;
            }
        }

        for entry in self.queue.drain() {
            entry.cancel();
        }
        self.publish(None, None, Some(ConnectionState::Disconnected));
    }

    /// Sleeps the retry delay; `false` when shut down instead.
    async fn pause(&self) -> bool {
        tokio::select! {
            () = tokio::time::sleep(self.retry_delay) => true,
            () = self.shutdown.cancelled() => false,
        }
    }

    /// Executes queued commands until the link drops or shutdown.
    async fn dispatch(&self) {
        let mut link = self.transport.connection_state();
        while self.transport.is_connected() {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                _ = link.changed() => (),
                entry = self.queue.pop() => self.execute(entry).await,
            }
        }
    }

    async fn execute(&self, entry: Pending) {
        if entry.is_abandoned() {
            debug!("dropping '{}', its sender gave up", entry.command.name());
            entry.cancel();
            return;
        }

        // The exchange runs on the loop's own context; a caller
        // canceling now only forfeits the result.
        let ctx = OpContext::new(self.shutdown.clone()).with_deadline(entry.deadline);
        let command = entry.command;
        let outcome = if entry.wants_payload {
            let reply = self.transport.send_inquiry(command, ctx).await;
            Outcome::Completed {
                response: reply.response,
                payload: reply.payload,
            }
        } else {
            Outcome::Completed {
                response: self.transport.send(command, ctx).await,
                payload: None,
            }
        };

        self.observe(&command, &outcome);
        entry.resolve(outcome);
    }

    /// Folds responses the loop happens to see into the status
    /// snapshot.
    fn observe(&self, command: &Command, outcome: &Outcome) {
        let Outcome::Completed { response, payload } = outcome else {
            return;
        };

        if *command == commands::POWER_ON && response.kind == ResponseKind::Completion {
            self.publish(None, Some(PowerMode::On), None);
        } else if *command == commands::POWER_OFF && response.kind == ResponseKind::Completion {
            self.publish(None, Some(PowerMode::Standby), None);
        } else if command == commands::INQUIRE_POWER.command()
            && response.kind == ResponseKind::Inquiry
        {
            if let Some(power) = payload
                .as_deref()
                .and_then(|p| commands::INQUIRE_POWER.parse_payload(p))
            {
                self.publish(None, Some(power), None);
            }
        } else if command == commands::INQUIRE_VERSION.command()
            && response.kind == ResponseKind::Inquiry
        {
            if let Some(version) = payload
                .as_deref()
                .and_then(|p| commands::INQUIRE_VERSION.parse_payload(p))
            {
                self.publish(Some(version), None, None);
            }
        }
    }

    /// Runs the baseline inquiries that seed the snapshot after a
    /// connect.
    async fn refresh_status(&self) {
        if let Some(version) = self.inquire(&commands::INQUIRE_VERSION).await {
            self.publish(Some(version), None, None);
        }
        if let Some(power) = self.inquire(&commands::INQUIRE_POWER).await {
            self.publish(None, Some(power), None);
        }
    }

    async fn inquire<V>(&self, inquiry: &InquiryCommand<V>) -> Option<V> {
        let ctx = OpContext::new(self.shutdown.clone());
        let reply = self.transport.send_inquiry(*inquiry.command(), ctx).await;
        if reply.response.kind != ResponseKind::Inquiry {
            warn!(
                "'{}' failed for '{}': {}",
                inquiry.name(),
                self.name,
                reply.response
            );
            return None;
        }
        reply.payload.as_deref().and_then(|p| inquiry.parse_payload(p))
    }

    /// Publishes a new snapshot only when something changed.
    fn publish(
        &self,
        version: Option<CameraVersion>,
        power: Option<PowerMode>,
        connection: Option<ConnectionState>,
    ) {
        self.status_tx
            .send_if_modified(|status| match status.with(version, power, connection) {
                Some(next) => {
                    debug!("'{}' status: {next}", self.name);
                    *status = next;
                    true
                }
                None => false,
            });
    }
}
