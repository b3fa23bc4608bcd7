//! Key/value extraction from `XAPPLEPUSHSERVICE` arguments.
//!
//! Arguments arrive as alternating key and value tokens. Keys are matched
//! case-insensitively; unrecognised keys are skipped so newer clients can send
//! extra attributes. When a key repeats, the later value replaces the earlier
//! one.

use std::collections::HashMap;

use super::errors::CommandError;
use super::tokens::ImapArg;

/// Attribute keys understood by the registration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    /// `aps-version`.
    Version,
    /// `aps-account-id`.
    AccountId,
    /// `aps-device-token`.
    DeviceToken,
    /// `aps-subtopic`.
    Subtopic,
    /// `mailboxes`, the only list-valued key.
    Mailboxes,
}

impl AttributeKey {
    const ALL: [Self; 5] = [
        Self::Version,
        Self::AccountId,
        Self::DeviceToken,
        Self::Subtopic,
        Self::Mailboxes,
    ];

    /// Wire spelling of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Version => "aps-version",
            Self::AccountId => "aps-account-id",
            Self::DeviceToken => "aps-device-token",
            Self::Subtopic => "aps-subtopic",
            Self::Mailboxes => "mailboxes",
        }
    }

    const fn expects_list(self) -> bool {
        matches!(self, Self::Mailboxes)
    }

    fn convert(self, value: ImapArg) -> Result<AttributeValue, CommandError> {
        match (value, self.expects_list()) {
            (ImapArg::Atom(text) | ImapArg::Quoted(text), false) => {
                Ok(AttributeValue::Scalar(text))
            }
            (ImapArg::List(items), true) => items
                .into_iter()
                .map(|item| match item {
                    ImapArg::Atom(text) | ImapArg::Quoted(text) => Ok(text),
                    ImapArg::List(_) => Err(CommandError::malformed(format!(
                        "nested list in {}",
                        self.as_str()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AttributeValue::List),
            (ImapArg::List(_), false) => Err(CommandError::malformed(format!(
                "{} expects a single value",
                self.as_str()
            ))),
            (ImapArg::Atom(_) | ImapArg::Quoted(_), true) => Err(CommandError::malformed(
                format!("{} expects a list", self.as_str()),
            )),
        }
    }

    /// Matches a client key without regard to ASCII case.
    #[must_use]
    pub fn from_wire(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(key))
    }
}

/// Value attached to an attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Single atom or quoted string.
    Scalar(String),
    /// Parenthesised list of atoms or quoted strings, order preserved.
    List(Vec<String>),
}

/// Recognised attributes extracted from one command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributeBag {
    values: HashMap<AttributeKey, AttributeValue>,
}

impl AttributeBag {
    /// Builds the bag from the command's argument tokens.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MalformedRequest`] when the tokens do not pair
    /// up, when a key is not an atom or string, or when a recognised key
    /// carries a value of the wrong shape.
    pub fn from_arguments(arguments: Vec<ImapArg>) -> Result<Self, CommandError> {
        if !arguments.len().is_multiple_of(2) {
            return Err(CommandError::malformed(format!(
                "expected key/value pairs, got {} tokens",
                arguments.len()
            )));
        }

        let mut bag = Self::default();
        let mut tokens = arguments.into_iter();
        while let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
            let Some(key_text) = key.as_astring() else {
                return Err(CommandError::malformed("attribute key must be a string"));
            };
            let Some(known) = AttributeKey::from_wire(key_text) else {
                tracing::debug!(
                    target: super::COMMAND_TARGET,
                    key = key_text,
                    "ignoring unknown attribute"
                );
                continue;
            };
            bag.values.insert(known, known.convert(value)?);
        }
        Ok(bag)
    }

    /// Returns the value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.values.get(&key)
    }

    /// Removes and returns the value stored for `key`.
    pub fn take(&mut self, key: AttributeKey) -> Option<AttributeValue> {
        self.values.remove(&key)
    }

    /// Number of recognised attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no recognised attribute was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
