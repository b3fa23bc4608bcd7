//! The `XAPPLEPUSHSERVICE` command pipeline.
//!
//! A command flows through the tokenizer, the attribute parser, the request
//! validator and the payload builder before the dispatcher takes over. Each
//! stage either hands a richer value to the next or stops with a
//! [`CommandError`] that becomes a tagged `NO` line.

pub mod attributes;
mod errors;
mod handler;
pub mod payload;
pub mod request;
pub mod response;
pub mod tokens;

pub use errors::{CommandError, RequiredField};
pub use handler::{CommandContext, Registered, RegistrationCommand};

/// Name of the registration command.
pub const COMMAND_NAME: &str = "XAPPLEPUSHSERVICE";

/// Tracing target for command processing.
pub(crate) const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::command");
