//! IMAP `XAPPLEPUSHSERVICE` bridge.
//!
//! Mail clients register a device for push notifications by sending
//! `XAPPLEPUSHSERVICE` with an account id, device token, subtopic and a list
//! of mailboxes. The bridge validates the command, attaches the session's
//! trusted user, and posts the registration as JSON to a separate push
//! daemon. The client is answered as soon as the request is handed off; the
//! daemon's reply is only logged, apart from the push topic it may report,
//! which later responses echo back.
//!
//! The crate is laid out as a pipeline:
//!
//! - [`command`] tokenizes, parses and validates the command, builds the
//!   payload and formats responses;
//! - [`dispatch`] submits payloads on a tokio runtime and routes completions
//!   back to the originating connection;
//! - [`Session`] hosts one pre-authenticated connection over any byte stream;
//! - [`run_bridge`] wires everything to stdin/stdout.
//!
//! Configuration comes from [`xaps_config`].

mod bootstrap;
pub mod command;
pub mod dispatch;
mod health;
mod identity;
mod process;
mod session;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, Bridge, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use identity::{CallerIdentity, DEFAULT_USER_VARIABLE, IdentityError};
pub use process::{LaunchError, run_bridge, run_bridge_with};
pub use session::{BASE_CAPABILITIES, MAX_LINE_BYTES, Session, SessionControl};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
