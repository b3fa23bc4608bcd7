use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Capability token announced to clients that may register for push.
pub const PUSH_CAPABILITY: &str = "XAPPLEPUSHSERVICE";

/// Whether the push registration command is offered to connections.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PushCapability {
    /// Advertise the capability and accept the command.
    #[default]
    Advertise,
    /// Hide the capability; the command is treated as unknown.
    Deny,
}

impl PushCapability {
    /// Returns `true` when connections should see and accept the command.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Advertise)
    }

    /// Appends the capability token to an IMAP capability list when enabled.
    #[must_use]
    pub fn extend_capabilities(self, base: &str) -> String {
        if self.is_enabled() {
            format!("{base} {PUSH_CAPABILITY}")
        } else {
            base.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("advertise", PushCapability::Advertise)]
    #[case("DENY", PushCapability::Deny)]
    #[case("Advertise", PushCapability::Advertise)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: PushCapability) {
        assert_eq!(PushCapability::from_str(input).expect("parse"), expected);
    }

    #[test]
    fn advertised_capability_is_appended() {
        assert_eq!(
            PushCapability::Advertise.extend_capabilities("IMAP4rev1"),
            "IMAP4rev1 XAPPLEPUSHSERVICE"
        );
    }

    #[test]
    fn denied_capability_leaves_list_untouched() {
        assert_eq!(
            PushCapability::Deny.extend_capabilities("IMAP4rev1"),
            "IMAP4rev1"
        );
        assert!(!PushCapability::Deny.is_enabled());
    }
}
