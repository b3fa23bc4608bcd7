use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the bridge's stderr log stream.
///
/// IMAP servers usually capture a post-login helper's stderr into their own
/// log, so JSON is the default; `compact` suits running `xapsd` by hand.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

impl LogFormat {
    /// Whether ANSI colour codes may be emitted. JSON lines are never
    /// coloured so that captured logs stay parseable.
    #[must_use]
    pub const fn permits_ansi(self, stderr_is_terminal: bool) -> bool {
        matches!(self, Self::Compact) && stderr_is_terminal
    }
}

/// Error returned when a [`LogFormat`] cannot be parsed.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(LogFormat::Json, true, false)]
    #[case(LogFormat::Json, false, false)]
    #[case(LogFormat::Compact, true, true)]
    #[case(LogFormat::Compact, false, false)]
    fn colour_only_for_compact_on_a_terminal(
        #[case] format: LogFormat,
        #[case] terminal: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(format.permits_ansi(terminal), expected);
    }

    #[test]
    fn parses_both_formats() {
        assert_eq!(LogFormat::from_str("JSON").expect("json"), LogFormat::Json);
        assert_eq!(
            LogFormat::from_str("compact").expect("compact"),
            LogFormat::Compact
        );
        assert!(LogFormat::from_str("pretty").is_err());
    }
}
