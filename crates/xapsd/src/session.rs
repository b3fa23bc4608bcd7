//! Pre-authenticated IMAP session over a byte stream.
//!
//! The session behaves like the post-login half of an IMAP server: it greets
//! with `PREAUTH`, answers `CAPABILITY`, `NOOP` and `LOGOUT`, and routes
//! `XAPPLEPUSHSERVICE` to the registration command. Reaching end of input or
//! logging out closes the connection and invalidates its pending dispatches.

use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};
use xaps_config::PushCapability;

use crate::command::response::{ResponseWriter, Status};
use crate::command::tokens::{CommandLine, split_command_line};
use crate::command::{COMMAND_NAME, CommandContext, RegistrationCommand};
use crate::dispatch::{
    CompletionHandler, DispatchOutcome, PendingDispatch, PendingDispatches, RegistrationDispatcher,
    RegistrationTransport,
};
use crate::identity::CallerIdentity;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Capabilities every session advertises.
pub const BASE_CAPABILITIES: &str = "IMAP4rev1";

/// Longest client line accepted, terminator included. Longer lines are
/// discarded and answered with `* BAD`.
pub const MAX_LINE_BYTES: u64 = 8192;

/// Whether the session loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Read the next line.
    Continue,
    /// The client logged out.
    Close,
}

/// One read from the client stream.
enum Incoming {
    Line,
    TooLong,
    End,
}

fn read_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<Incoming> {
    let mut limited = reader.by_ref().take(MAX_LINE_BYTES);
    if limited.read_until(b'\n', line)? == 0 {
        return Ok(Incoming::End);
    }
    if line.ends_with(b"\n") || limited.limit() > 0 {
        return Ok(Incoming::Line);
    }
    reader.skip_until(b'\n')?;
    Ok(Incoming::TooLong)
}

/// Tag of a line that could not be decoded, when it is a plain atom.
fn raw_tag(line: &[u8]) -> Option<&str> {
    line.split(|byte| *byte == b' ')
        .next()
        .filter(|tag| !tag.is_empty() && tag.iter().all(u8::is_ascii_graphic))
        .and_then(|tag| std::str::from_utf8(tag).ok())
}

/// Logs completions for one connection.
#[derive(Debug)]
struct SessionCompletion {
    user: CallerIdentity,
}

impl CompletionHandler for SessionCompletion {
    fn completed(&self, dispatch: PendingDispatch, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Accepted { status, .. } => debug!(
                target: SESSION_TARGET,
                user = %self.user,
                token = %dispatch.token(),
                status,
                "registration completed"
            ),
            DispatchOutcome::Rejected { status, .. } => warn!(
                target: SESSION_TARGET,
                user = %self.user,
                token = %dispatch.token(),
                status,
                "registration not stored by daemon"
            ),
            DispatchOutcome::Failed(error) => warn!(
                target: SESSION_TARGET,
                user = %self.user,
                token = %dispatch.token(),
                %error,
                "registration did not reach daemon"
            ),
        }
    }
}

/// One client connection.
pub struct Session<T> {
    command: RegistrationCommand<T>,
    context: CommandContext,
    pending: Arc<PendingDispatches>,
    capability: PushCapability,
    closed: bool,
}

impl<T: RegistrationTransport> Session<T> {
    /// Opens a session for `caller`, registering it with the dispatcher's
    /// pending registry.
    #[must_use]
    pub fn open(
        dispatcher: Arc<RegistrationDispatcher<T>>,
        caller: CallerIdentity,
        capability: PushCapability,
    ) -> Self {
        let pending = Arc::clone(dispatcher.pending());
        let completion = Arc::new(SessionCompletion {
            user: caller.clone(),
        });
        let scope = pending.open_connection(completion);
        info!(
            target: SESSION_TARGET,
            user = %caller,
            connection = %scope.id(),
            push = capability.is_enabled(),
            "session opened"
        );
        Self {
            command: RegistrationCommand::new(dispatcher),
            context: CommandContext::new(caller, scope),
            pending,
            capability,
            closed: false,
        }
    }

    /// Context commands run against.
    #[must_use]
    pub const fn context(&self) -> &CommandContext {
        &self.context
    }

    fn capabilities(&self) -> String {
        self.capability.extend_capabilities(BASE_CAPABILITIES)
    }

    /// Writes the `PREAUTH` greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn greet<W: Write>(&self, writer: &mut ResponseWriter<W>) -> io::Result<()> {
        writer.untagged(&format!(
            "PREAUTH [CAPABILITY {}] Logged in as {}",
            self.capabilities(),
            self.context.caller()
        ))?;
        writer.flush()
    }

    /// Handles one client line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the response fails.
    pub fn handle_line<W: Write>(
        &mut self,
        line: &str,
        writer: &mut ResponseWriter<W>,
    ) -> io::Result<SessionControl> {
        if line.trim().is_empty() {
            return Ok(SessionControl::Continue);
        }
        let Ok(CommandLine {
            tag,
            name,
            arguments,
        }) = split_command_line(line)
        else {
            writer.untagged("BAD Missing command tag.")?;
            writer.flush()?;
            return Ok(SessionControl::Continue);
        };

        match name.to_ascii_uppercase().as_str() {
            "CAPABILITY" => {
                writer.untagged(&format!("CAPABILITY {}", self.capabilities()))?;
                writer.tagged(tag, Status::Ok, "CAPABILITY completed.")?;
            }
            "NOOP" => writer.tagged(tag, Status::Ok, "NOOP completed.")?,
            "LOGOUT" => {
                writer.untagged("BYE Logging out")?;
                writer.tagged(tag, Status::Ok, "LOGOUT completed.")?;
                self.close();
                return Ok(SessionControl::Close);
            }
            command if command == COMMAND_NAME && self.capability.is_enabled() => {
                self.command.execute(tag, arguments, &self.context, writer)?;
            }
            _ => writer.tagged(tag, Status::Bad, "Unknown command.")?,
        }
        Ok(SessionControl::Continue)
    }

    /// Serves the connection until `LOGOUT` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the stream fails. The
    /// connection is closed either way.
    pub fn run<R: BufRead, W: Write>(mut self, mut reader: R, writer: W) -> io::Result<()> {
        let mut writer = ResponseWriter::new(writer);
        let result = self.serve(&mut reader, &mut writer);
        self.close();
        result
    }

    fn serve<R: BufRead, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut ResponseWriter<W>,
    ) -> io::Result<()> {
        self.greet(writer)?;
        let mut line = Vec::new();
        loop {
            line.clear();
            match read_line(reader, &mut line)? {
                Incoming::End => {
                    debug!(target: SESSION_TARGET, "client reached end of input");
                    return Ok(());
                }
                Incoming::TooLong => {
                    warn!(
                        target: SESSION_TARGET,
                        limit = MAX_LINE_BYTES,
                        "discarded overlong client line"
                    );
                    writer.untagged("BAD Line too long.")?;
                    writer.flush()?;
                }
                Incoming::Line => match std::str::from_utf8(&line) {
                    Ok(text) => {
                        if self.handle_line(text, writer)? == SessionControl::Close {
                            return Ok(());
                        }
                    }
                    Err(error) => refuse_undecodable(&line, &error, writer)?,
                },
            }
        }
    }

    /// Tears the connection down. Later completions for it are discarded.
    ///
    /// Returns the number of dispatches that were still pending. Calling it
    /// again returns zero.
    pub fn close(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;
        let invalidated = self.pending.invalidate_connection(self.context.scope().id());
        info!(
            target: SESSION_TARGET,
            user = %self.context.caller(),
            connection = %self.context.scope().id(),
            invalidated,
            "session closed"
        );
        invalidated
    }
}

fn refuse_undecodable<W: Write>(
    line: &[u8],
    error: &std::str::Utf8Error,
    writer: &mut ResponseWriter<W>,
) -> io::Result<()> {
    warn!(target: SESSION_TARGET, %error, "client line is not valid UTF-8");
    match raw_tag(line) {
        Some(tag) => writer.tagged(tag, Status::Bad, "Line is not valid UTF-8."),
        None => {
            writer.untagged("BAD Line is not valid UTF-8.")?;
            writer.flush()
        }
    }
}

impl<T> Drop for Session<T> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            let invalidated = self.pending.invalidate_connection(self.context.scope().id());
            debug!(target: SESSION_TARGET, invalidated, "session dropped without closing");
        }
    }
}
