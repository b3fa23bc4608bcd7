//! Push topic reported back to clients.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;

/// Most recent topic returned by the registration daemon.
///
/// Starts empty; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct TopicCell {
    inner: Arc<RwLock<String>>,
}

impl TopicCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current topic, or the empty string if none has been reported.
    #[must_use]
    pub fn current(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the stored topic.
    pub fn replace(&self, topic: impl Into<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = topic.into();
    }
}

#[derive(Deserialize)]
struct DaemonReply {
    #[serde(rename = "Topic")]
    topic: Option<String>,
}

/// Extracts a non-empty `Topic` from a daemon response body.
///
/// Topics carrying control characters are ignored: they are echoed inside
/// response lines and must not be able to break the framing.
pub(crate) fn topic_from_body(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<DaemonReply>(body)
        .ok()
        .and_then(|reply| reply.topic)
        .filter(|topic| !topic.is_empty() && !topic.chars().any(char::is_control))
}
