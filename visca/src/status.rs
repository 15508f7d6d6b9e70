use visca_protocol::{CameraVersion, PowerMode};

/// Observed state of the transport link.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ConnectionState {
    /// No connection attempt has completed yet.
    #[default]
    Unknown,
    /// A connection attempt is in progress.
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Immutable snapshot of everything the connection knows about the
/// camera.
///
/// Snapshots are published on a watch channel and compared by value; an
/// update that changes nothing is never re-published.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct CameraStatus {
    pub version: CameraVersion,
    pub power: PowerMode,
    pub connection: ConnectionState,
}

impl CameraStatus {
    pub const UNKNOWN: CameraStatus = CameraStatus {
        version: CameraVersion::UNKNOWN,
        power: PowerMode::Unknown,
        connection: ConnectionState::Unknown,
    };

    /// A copy with the given fields replaced, or `None` when nothing
    /// would change.
    pub fn with(
        &self,
        version: Option<CameraVersion>,
        power: Option<PowerMode>,
        connection: Option<ConnectionState>,
    ) -> Option<CameraStatus> {
        let next = CameraStatus {
            version: version.unwrap_or(self.version),
            power: power.unwrap_or(self.power),
            connection: connection.unwrap_or(self.connection),
        };

        (next != *self).then_some(next)
    }
}

impl Default for CameraStatus {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl std::fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, power {}, version: {}",
            self.connection, self.power, self.version
        )
    }
}
