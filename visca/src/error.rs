use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] visca_protocol::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The command was dropped before a response was delivered, either
    /// by the caller's context or by [`cancel_all`][crate::CameraConnection::cancel_all].
    #[error("the command was canceled")]
    Canceled,

    /// The connection was closed and accepts no further commands.
    #[error("the connection is closed")]
    Closed,

    #[error("channel unavailable, likely dropped")]
    ChannelUnavailable,
}
