use crate::{Error, Result};
use std::{net::SocketAddr, time::Duration};

/// Minimum accepted value for any of the timeouts.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection settings for a single camera.
///
/// [`new`][Self::new] fills in defaults suitable for a camera on a local
/// network; tweak fields directly before handing the config to
/// [`CameraConnection::open`][crate::CameraConnection::open], which
/// validates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Address of the camera's VISCA-over-TCP endpoint.
    pub addr: SocketAddr,

    /// Display name used in log messages; defaults to the address.
    pub name: Option<String>,

    /// VISCA device address, `0..=7`.
    pub device_id: u8,

    /// Per-command budget, covering queue wait and the full
    /// ACK→Completion exchange.
    pub max_timeout: Duration,

    /// Budget for establishing the TCP connection and clearing the
    /// device's command buffers.
    pub connect_timeout: Duration,

    /// Delay between reconnection attempts.
    pub retry_delay: Duration,

    /// Commands that may wait in the queue; further senders block until
    /// a slot frees up.
    pub queue_depth: usize,
}

impl CameraConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            name: None,
            device_id: 1,
            max_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            queue_depth: 4,
        }
    }

    /// The name used in log messages.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.addr.to_string())
    }

    pub(crate) fn validate(&self) -> Result {
        if self.device_id > 7 {
            return Err(Error::InvalidConfig("device_id must be 0..=7"));
        }

        if self.max_timeout < MIN_TIMEOUT
            || self.connect_timeout < MIN_TIMEOUT
            || self.retry_delay < MIN_TIMEOUT
        {
            return Err(Error::InvalidConfig("timeouts must be at least 100ms"));
        }

        if self.connect_timeout > self.max_timeout {
            return Err(Error::InvalidConfig(
                "connect_timeout must not exceed max_timeout",
            ));
        }

        if self.queue_depth == 0 {
            return Err(Error::InvalidConfig("queue_depth must be at least 1"));
        }

        Ok(())
    }
}
