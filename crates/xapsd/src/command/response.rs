//! IMAP response lines written back to the client.
//!
//! The writer handles CRLF framing and quoting so callers only deal in
//! statuses and text.

use std::fmt;
use std::io::{self, Write};

use super::errors::CommandError;

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed.
    Ok,
    /// Command failed.
    No,
    /// Command could not be understood.
    Bad,
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        })
    }
}

/// Writes IMAP response lines to a stream.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps the given output stream.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes an untagged `* ...` line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn untagged(&mut self, text: &str) -> io::Result<()> {
        write!(self.writer, "* {text}\r\n")
    }

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Writes a tagged completion line and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn tagged(&mut self, tag: &str, status: Status, text: &str) -> io::Result<()> {
        write!(self.writer, "{tag} {status} {text}\r\n")?;
        self.writer.flush()
    }

    /// Writes the informational and completion lines of an accepted
    /// registration.
    ///
    /// A value that cannot travel as a quoted string is sent as `""`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn registration_accepted(
        &mut self,
        tag: &str,
        version: &str,
        topic: &str,
    ) -> io::Result<()> {
        let quoted_or_empty = |value: &str| quote(value).unwrap_or_else(|| String::from("\"\""));
        self.untagged(&format!(
            "XAPPLEPUSHSERVICE aps-version {} aps-topic {}",
            quoted_or_empty(version),
            quoted_or_empty(topic)
        ))?;
        self.tagged(tag, Status::Ok, "XAPPLEPUSHSERVICE completed.")
    }

    /// Writes the tagged `NO` line for a failed registration.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn command_failed(&mut self, tag: &str, error: &CommandError) -> io::Result<()> {
        self.tagged(tag, Status::No, error.diagnostic())
    }
}

/// Renders `value` as an IMAP quoted string.
///
/// Returns `None` when `value` holds CR, LF or NUL, which no quoted string
/// may carry.
#[must_use]
pub fn quote(value: &str) -> Option<String> {
    if value.contains(['\r', '\n', '\0']) {
        return None;
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for character in value.chars() {
        if matches!(character, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(character);
    }
    quoted.push('"');
    Some(quoted)
}
