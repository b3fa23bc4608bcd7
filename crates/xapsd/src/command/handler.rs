//! Runs one `XAPPLEPUSHSERVICE` invocation end to end.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatch::{
    ConnectionScope, PendingDispatch, RegistrationDispatcher, RegistrationTransport,
};
use crate::identity::CallerIdentity;

use super::COMMAND_TARGET;
use super::attributes::AttributeBag;
use super::errors::CommandError;
use super::payload::RegistrationPayload;
use super::request::RegistrationRequest;
use super::response::ResponseWriter;
use super::tokens::parse_arguments;

/// Per-connection state a command runs against.
#[derive(Debug, Clone)]
pub struct CommandContext {
    caller: CallerIdentity,
    scope: ConnectionScope,
}

impl CommandContext {
    /// Binds `caller` to the connection `scope`.
    #[must_use]
    pub const fn new(caller: CallerIdentity, scope: ConnectionScope) -> Self {
        Self { caller, scope }
    }

    /// Trusted session user.
    #[must_use]
    pub const fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    /// Connection the session's dispatches belong to.
    #[must_use]
    pub const fn scope(&self) -> &ConnectionScope {
        &self.scope
    }
}

/// Result of a submitted registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    /// Accepted `aps-version`.
    pub version: String,
    /// Topic known when the registration was submitted, possibly empty.
    pub topic: String,
    /// Handle of the in-flight exchange.
    pub dispatch: PendingDispatch,
}

/// The `XAPPLEPUSHSERVICE` command.
pub struct RegistrationCommand<T> {
    dispatcher: Arc<RegistrationDispatcher<T>>,
}

impl<T: RegistrationTransport> RegistrationCommand<T> {
    /// Creates the command over a shared dispatcher.
    #[must_use]
    pub const fn new(dispatcher: Arc<RegistrationDispatcher<T>>) -> Self {
        Self { dispatcher }
    }

    /// Dispatcher registrations are submitted to.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<RegistrationDispatcher<T>> {
        &self.dispatcher
    }

    /// Parses, validates and submits a registration.
    ///
    /// # Errors
    ///
    /// Returns the first [`CommandError`] raised by any stage. Nothing is
    /// submitted unless every check passes.
    pub fn register(
        &self,
        arguments: &str,
        context: &CommandContext,
    ) -> Result<Registered, CommandError> {
        let tokens =
            parse_arguments(arguments).map_err(|error| CommandError::malformed(error.to_string()))?;
        let bag = AttributeBag::from_arguments(tokens)?;
        let request = RegistrationRequest::validate(bag, &context.caller)?;
        let version = request.protocol_version().to_owned();
        let payload = RegistrationPayload::from_request(request);
        let dispatch = self
            .dispatcher
            .submit(&context.scope, &payload)
            .map_err(CommandError::dispatch)?;
        Ok(Registered {
            version,
            topic: self.dispatcher.topic().current(),
            dispatch,
        })
    }

    /// Runs the command and writes its response lines.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing to the client fails; command
    /// failures become a tagged `NO` line.
    pub fn execute<W: Write>(
        &self,
        tag: &str,
        arguments: &str,
        context: &CommandContext,
        writer: &mut ResponseWriter<W>,
    ) -> io::Result<()> {
        match self.register(arguments, context) {
            Ok(registered) => {
                debug!(
                    target: COMMAND_TARGET,
                    tag,
                    user = %context.caller,
                    token = %registered.dispatch.token(),
                    "registration submitted"
                );
                writer.registration_accepted(tag, &registered.version, &registered.topic)
            }
            Err(error) => {
                warn!(
                    target: COMMAND_TARGET,
                    tag,
                    user = %context.caller,
                    %error,
                    "registration refused"
                );
                writer.command_failed(tag, &error)
            }
        }
    }
}
