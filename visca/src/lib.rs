#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

mod camera;
mod config;
mod connection;
mod context;
mod error;
mod queue;
mod status;
mod tcp;
mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::{
    camera::Camera,
    config::{CameraConfig, MIN_TIMEOUT},
    connection::CameraConnection,
    context::OpContext,
    error::Error,
    status::{CameraStatus, ConnectionState},
    tcp::TcpTransport,
    transport::{InquiryReply, Transport},
};

/// Re-export of the wire codec crate.
pub use visca_protocol as protocol;

pub type Result<T = ()> = std::result::Result<T, Error>;
