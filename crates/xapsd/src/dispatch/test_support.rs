//! Test doubles for the dispatch layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use super::dispatcher::{CompletionHandler, DispatchOutcome};
use super::errors::TransportError;
use super::pending::PendingDispatch;
use super::transport::{RegistrationTransport, TransportResponse};

/// Request observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) endpoint: Url,
    pub(crate) body: Vec<u8>,
}

impl RecordedRequest {
    pub(crate) fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

#[derive(Debug)]
struct Script {
    reply: Result<TransportResponse, TransportError>,
    held: AtomicBool,
    release: Notify,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Transport that records requests and answers from a script.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedTransport {
    script: Arc<Script>,
}

impl ScriptedTransport {
    fn with_reply(reply: Result<TransportResponse, TransportError>) -> Self {
        Self {
            script: Arc::new(Script {
                reply,
                held: AtomicBool::new(false),
                release: Notify::new(),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn replying(status: u16, body: &[u8]) -> Self {
        Self::with_reply(Ok(TransportResponse {
            status,
            body: body.to_vec(),
        }))
    }

    pub(crate) fn failing(error: TransportError) -> Self {
        Self::with_reply(Err(error))
    }

    /// Holds every reply until [`release`](Self::release) is called.
    pub(crate) fn held(self) -> Self {
        self.script.held.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn release(&self) {
        self.script.held.store(false, Ordering::SeqCst);
        self.script.release.notify_waiters();
        self.script.release.notify_one();
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.script
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn wait_for_requests(&self, count: usize, timeout: Duration) {
        wait_until(timeout, || self.requests().len() >= count);
        assert!(
            self.requests().len() >= count,
            "expected {count} requests, saw {}",
            self.requests().len()
        );
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !done() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[async_trait]
impl RegistrationTransport for ScriptedTransport {
    async fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        self.script
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                endpoint: endpoint.clone(),
                body,
            });
        if self.script.held.load(Ordering::SeqCst) {
            self.script.release.notified().await;
        }
        self.script.reply.clone()
    }
}

/// Completion delivered to [`RecordingCompletion`].
pub(crate) type Completed = (PendingDispatch, DispatchOutcome);

/// Forwards completions to a channel.
#[derive(Debug)]
pub(crate) struct RecordingCompletion {
    sender: Sender<Completed>,
}

impl CompletionHandler for RecordingCompletion {
    fn completed(&self, dispatch: PendingDispatch, outcome: &DispatchOutcome) {
        // The receiver is gone once a test has seen what it needs.
        self.sender.send((dispatch, outcome.clone())).ok();
    }
}

pub(crate) fn recording_completion() -> (Arc<RecordingCompletion>, Receiver<Completed>) {
    let (sender, receiver) = mpsc::channel();
    (Arc::new(RecordingCompletion { sender }), receiver)
}
