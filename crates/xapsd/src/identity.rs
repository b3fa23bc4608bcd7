//! Trusted caller identity for a session.
//!
//! The identity is fixed when the session starts and is never taken from
//! command arguments. It comes from the environment variable named by the
//! `user_lookup` setting when that variable is set and non-empty, and from
//! `USER` otherwise.

use std::fmt;

use thiserror::Error;
use xaps_config::Config;

const IDENTITY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::identity");

/// Variable consulted when no lookup override applies.
pub const DEFAULT_USER_VARIABLE: &str = "USER";

/// Authenticated mailbox user attached to every registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Wraps an already authenticated user name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Empty`] for a blank name.
    pub fn new(user: impl Into<String>) -> Result<Self, IdentityError> {
        let name = user.into();
        if name.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(name))
    }

    /// Resolves the identity using `lookup` to read environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Unresolved`] when neither the override nor
    /// `USER` yields a non-empty value.
    pub fn resolve<F>(config: &Config, lookup: F) -> Result<Self, IdentityError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(variable) = config.user_lookup() {
            if let Some(user) = non_empty(variable) {
                return Self::new(user);
            }
            tracing::debug!(
                target: IDENTITY_TARGET,
                variable,
                "user lookup variable unset, falling back to USER"
            );
        }

        non_empty(DEFAULT_USER_VARIABLE)
            .map(Self)
            .ok_or_else(|| IdentityError::Unresolved {
                variable: config
                    .user_lookup()
                    .unwrap_or(DEFAULT_USER_VARIABLE)
                    .to_owned(),
            })
    }

    /// Resolves the identity from the process environment.
    ///
    /// # Errors
    ///
    /// See [`CallerIdentity::resolve`].
    pub fn from_environment(config: &Config) -> Result<Self, IdentityError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// The user name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Errors raised while establishing the caller identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The supplied user name was blank.
    #[error("caller identity must not be empty")]
    Empty,
    /// No environment variable provided a user name.
    #[error("no user name found in ${variable} or $USER")]
    Unresolved {
        /// Variable consulted first.
        variable: String,
    },
}
