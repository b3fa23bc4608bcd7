//! Error taxonomy for the `XAPPLEPUSHSERVICE` command.
//!
//! Every variant is terminal for the current command invocation and maps to
//! exactly one diagnostic sent back on the tagged `NO` line. Transport details
//! stay in the logs; clients only ever see the fixed diagnostic text.

use std::fmt;

use thiserror::Error;

use crate::dispatch::DispatchError;

/// Required request fields, in validation order after the version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    /// `aps-account-id`.
    AccountId,
    /// `aps-device-token`.
    DeviceToken,
    /// `aps-subtopic`.
    Subtopic,
    /// `mailboxes`.
    Mailboxes,
}

impl RequiredField {
    /// Wire name of the field as sent by the client.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::AccountId => "aps-account-id",
            Self::DeviceToken => "aps-device-token",
            Self::Subtopic => "aps-subtopic",
            Self::Mailboxes => "mailboxes",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.wire_name())
    }
}

/// Failures raised while turning a command into a registration.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The token stream did not have the expected shape.
    #[error("malformed request: {reason}")]
    MalformedRequest {
        /// What was wrong, for the logs.
        reason: String,
    },

    /// `aps-version` was absent or not the supported value.
    #[error("unsupported aps-version {found:?}")]
    UnsupportedVersion {
        /// Version the client sent, if it sent a scalar.
        found: Option<String>,
    },

    /// A required field was absent or empty.
    #[error("missing or empty {field}")]
    MissingField {
        /// First field found missing.
        field: RequiredField,
    },

    /// The registration could not be handed to the transport.
    #[error("registration dispatch failed: {source}")]
    DispatchFailure {
        /// Dispatcher error.
        #[source]
        source: DispatchError,
    },
}

impl CommandError {
    /// Creates a malformed request error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported version error.
    #[must_use]
    pub fn unsupported_version(found: Option<&str>) -> Self {
        Self::UnsupportedVersion {
            found: found.map(str::to_owned),
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub const fn missing(field: RequiredField) -> Self {
        Self::MissingField { field }
    }

    /// Creates a dispatch failure.
    #[must_use]
    pub const fn dispatch(source: DispatchError) -> Self {
        Self::DispatchFailure { source }
    }

    /// Client-facing diagnostic carried on the tagged `NO` line.
    #[must_use]
    pub const fn diagnostic(&self) -> &'static str {
        match self {
            Self::MalformedRequest { .. } => "Invalid arguments.",
            Self::UnsupportedVersion { .. } => "Unknown aps-version.",
            Self::MissingField { field } => match field {
                RequiredField::AccountId => "Incomplete or empty aps-account-id parameter.",
                RequiredField::DeviceToken => "Incomplete or empty aps-device-token parameter.",
                RequiredField::Subtopic => "Incomplete or empty aps-subtopic parameter.",
                RequiredField::Mailboxes => "Incomplete or empty mailboxes parameter.",
            },
            Self::DispatchFailure { .. } => "Registration failed.",
        }
    }
}
