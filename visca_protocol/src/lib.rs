#![doc = include_str!("../README.md")]

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate tracing;

mod catalog;
mod command;
pub mod commands;
mod error;
mod inquiry;
mod response;
mod structs;

#[cfg(test)]
pub(crate) mod testlog;

pub use crate::{
    catalog::CommandCatalog,
    command::{Command, CommandKind, CANCEL_TYPE_BASE, TERMINATOR},
    error::Error,
    inquiry::InquiryCommand,
    response::{InquiryResponse, Response, ResponseKind},
    structs::{CameraVersion, FocusMode, PowerMode},
};

/// Result type.
pub type Result<T = ()> = std::result::Result<T, Error>;
