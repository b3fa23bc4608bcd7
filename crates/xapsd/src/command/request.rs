//! Validation of an attribute bag into a registration request.

use crate::identity::CallerIdentity;

use super::attributes::{AttributeBag, AttributeKey, AttributeValue};
use super::errors::{CommandError, RequiredField};

/// The only `aps-version` this bridge speaks.
pub const SUPPORTED_VERSION: &str = "2";

/// A fully validated registration.
///
/// Values are only constructed through [`RegistrationRequest::validate`], so
/// every field is known to be present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    protocol_version: String,
    account_id: String,
    device_token: String,
    subtopic: String,
    mailboxes: Vec<String>,
    caller_identity: CallerIdentity,
}

impl RegistrationRequest {
    /// Checks the bag and attaches the session's caller identity.
    ///
    /// Checks run in a fixed order and the first failure is reported: the
    /// version, then the account id, device token, subtopic and mailboxes.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnsupportedVersion`] or
    /// [`CommandError::MissingField`].
    pub fn validate(
        mut bag: AttributeBag,
        caller_identity: &CallerIdentity,
    ) -> Result<Self, CommandError> {
        let protocol_version = match bag.take(AttributeKey::Version) {
            Some(AttributeValue::Scalar(version)) if version == SUPPORTED_VERSION => version,
            Some(AttributeValue::Scalar(version)) => {
                return Err(CommandError::unsupported_version(Some(&version)));
            }
            Some(AttributeValue::List(_)) | None => {
                return Err(CommandError::unsupported_version(None));
            }
        };

        let account_id = required_scalar(&mut bag, RequiredField::AccountId)?;
        let device_token = required_scalar(&mut bag, RequiredField::DeviceToken)?;
        let subtopic = required_scalar(&mut bag, RequiredField::Subtopic)?;
        let mailboxes = match bag.take(AttributeKey::Mailboxes) {
            Some(AttributeValue::List(mailboxes)) if !mailboxes.is_empty() => mailboxes,
            _ => return Err(CommandError::missing(RequiredField::Mailboxes)),
        };

        Ok(Self {
            protocol_version,
            account_id,
            device_token,
            subtopic,
            mailboxes,
            caller_identity: caller_identity.clone(),
        })
    }

    /// Value of `aps-version`, always [`SUPPORTED_VERSION`].
    #[must_use]
    pub const fn protocol_version(&self) -> &str {
        self.protocol_version.as_str()
    }

    /// Value of `aps-account-id`.
    #[must_use]
    pub const fn account_id(&self) -> &str {
        self.account_id.as_str()
    }

    /// Value of `aps-device-token`.
    #[must_use]
    pub const fn device_token(&self) -> &str {
        self.device_token.as_str()
    }

    /// Value of `aps-subtopic`.
    #[must_use]
    pub const fn subtopic(&self) -> &str {
        self.subtopic.as_str()
    }

    /// Mailboxes in the order the client listed them.
    #[must_use]
    pub const fn mailboxes(&self) -> &[String] {
        self.mailboxes.as_slice()
    }

    /// Session user the registration is made for.
    #[must_use]
    pub const fn caller_identity(&self) -> &CallerIdentity {
        &self.caller_identity
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            account_id: self.account_id,
            device_token: self.device_token,
            subtopic: self.subtopic,
            username: self.caller_identity.as_str().to_owned(),
            mailboxes: self.mailboxes,
        }
    }
}

/// Owned fields handed to the payload builder.
pub(crate) struct RequestParts {
    pub(crate) account_id: String,
    pub(crate) device_token: String,
    pub(crate) subtopic: String,
    pub(crate) username: String,
    pub(crate) mailboxes: Vec<String>,
}

fn required_scalar(bag: &mut AttributeBag, field: RequiredField) -> Result<String, CommandError> {
    let key = match field {
        RequiredField::AccountId => AttributeKey::AccountId,
        RequiredField::DeviceToken => AttributeKey::DeviceToken,
        RequiredField::Subtopic => AttributeKey::Subtopic,
        RequiredField::Mailboxes => AttributeKey::Mailboxes,
    };
    match bag.take(key) {
        Some(AttributeValue::Scalar(value)) if !value.is_empty() => Ok(value),
        _ => Err(CommandError::missing(field)),
    }
}
