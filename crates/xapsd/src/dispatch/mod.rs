//! Delivery of registrations to the push daemon.
//!
//! The dispatcher owns no runtime of its own: it spawns each HTTP exchange on
//! the handle it was given and correlates completions with connections
//! through the shared [`PendingDispatches`] registry.

mod dispatcher;
mod errors;
mod pending;
mod topic;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::{CompletionHandler, DispatchOutcome, RegistrationDispatcher};
pub use errors::{DispatchError, TransportError};
pub use pending::{ConnectionId, ConnectionScope, DispatchToken, PendingDispatch, PendingDispatches};
pub use topic::TopicCell;
pub use transport::{HttpTransport, JSON_CONTENT_TYPE, RegistrationTransport, TransportResponse};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
