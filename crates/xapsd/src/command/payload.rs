//! JSON body posted to the registration daemon.

use serde::Serialize;

use super::request::RegistrationRequest;

/// Mailbox registered when a legacy caller supplies none.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Registration body in the daemon's field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationPayload {
    #[serde(rename = "ApsAccountId")]
    account_id: String,
    #[serde(rename = "ApsDeviceToken")]
    device_token: String,
    #[serde(rename = "ApsSubtopic")]
    subtopic: String,
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Mailboxes")]
    mailboxes: Vec<String>,
}

impl RegistrationPayload {
    /// Builds the payload from a validated request.
    #[must_use]
    pub fn from_request(request: RegistrationRequest) -> Self {
        let parts = request.into_parts();
        Self {
            account_id: parts.account_id,
            device_token: parts.device_token,
            subtopic: parts.subtopic,
            username: parts.username,
            mailboxes: parts.mailboxes,
        }
    }

    /// Builds a payload for callers that bypass validation.
    ///
    /// An empty mailbox list registers [`DEFAULT_MAILBOX`] alone.
    #[must_use]
    pub fn legacy(
        account_id: &str,
        device_token: &str,
        subtopic: &str,
        username: &str,
        mailboxes: &[&str],
    ) -> Self {
        let registered = if mailboxes.is_empty() {
            vec![DEFAULT_MAILBOX.to_owned()]
        } else {
            mailboxes.iter().map(|name| (*name).to_owned()).collect()
        };
        Self {
            account_id: account_id.to_owned(),
            device_token: device_token.to_owned(),
            subtopic: subtopic.to_owned(),
            username: username.to_owned(),
            mailboxes: registered,
        }
    }

    /// Mailboxes to watch, in registration order.
    #[must_use]
    pub const fn mailboxes(&self) -> &[String] {
        self.mailboxes.as_slice()
    }

    /// Trusted session user the device is registered for.
    #[must_use]
    pub const fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Serialises the payload as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; string-only payloads do not fail in
    /// practice.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::command::attributes::AttributeBag;
    use crate::command::tokens::parse_arguments;
    use crate::identity::CallerIdentity;

    fn encoded(payload: &RegistrationPayload) -> String {
        String::from_utf8(payload.encode().expect("encode")).expect("utf8")
    }

    #[test]
    fn validated_request_produces_exact_body() {
        let tokens = parse_arguments(
            "aps-version 2 aps-account-id A1B2 aps-device-token DEADBEEF \
             aps-subtopic com.apple.mobilemail mailboxes (INBOX Notes)",
        )
        .expect("tokenize");
        let bag = AttributeBag::from_arguments(tokens).expect("bag");
        let identity = CallerIdentity::new("alice").expect("identity");
        let request = RegistrationRequest::validate(bag, &identity).expect("valid");

        let payload = RegistrationPayload::from_request(request);
        assert_eq!(
            encoded(&payload),
            concat!(
                r#"{"ApsAccountId":"A1B2","ApsDeviceToken":"DEADBEEF","#,
                r#""ApsSubtopic":"com.apple.mobilemail","Username":"alice","#,
                r#""Mailboxes":["INBOX","Notes"]}"#
            )
        );
    }

    #[rstest]
    #[case(&[], r#"["INBOX"]"#)]
    #[case(&["Work"], r#"["Work"]"#)]
    fn legacy_entry_point_defaults_to_inbox(#[case] mailboxes: &[&str], #[case] expected: &str) {
        let payload = RegistrationPayload::legacy("a", "t", "s", "u", mailboxes);
        assert!(
            encoded(&payload).ends_with(&format!(r#""Mailboxes":{expected}}}"#)),
            "unexpected body: {}",
            encoded(&payload)
        );
    }

    #[test]
    fn strings_are_json_escaped() {
        let payload =
            RegistrationPayload::legacy("a\"b", "t", "s", "u", &["Inbox\\Archive", "Line\nBreak"]);
        let body = encoded(&payload);
        assert!(body.contains(r#""ApsAccountId":"a\"b""#));
        assert!(body.contains(r#""Inbox\\Archive""#));
        assert!(body.contains(r#""Line\nBreak""#));
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(parsed["Mailboxes"][1], "Line\nBreak");
    }

    #[test]
    fn awkward_caller_identity_survives_the_round_trip() {
        let user = "mail\"admin\u{1}";
        let tokens = parse_arguments(
            "aps-version 2 aps-account-id A1B2 aps-device-token DEADBEEF \
             aps-subtopic com.apple.mobilemail mailboxes (INBOX)",
        )
        .expect("tokenize");
        let bag = AttributeBag::from_arguments(tokens).expect("bag");
        let identity = CallerIdentity::new(user).expect("identity");
        let request = RegistrationRequest::validate(bag, &identity).expect("valid");

        let body = encoded(&RegistrationPayload::from_request(request));
        assert!(body.contains(r#""Username":"mail\"admin\u0001""#), "{body}");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(parsed["Username"], user);
    }
}
