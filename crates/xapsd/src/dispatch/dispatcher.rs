//! Non-blocking submission of registrations.
//!
//! [`RegistrationDispatcher::submit`] serialises the payload, registers a
//! [`PendingDispatch`] and spawns the HTTP exchange on the service runtime. It
//! returns as soon as the task is spawned. When the exchange finishes, the
//! task claims its token; if the connection has gone away in the meantime
//! the outcome is logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use url::Url;

use crate::command::payload::RegistrationPayload;

use super::DISPATCH_TARGET;
use super::errors::{DispatchError, TransportError};
use super::pending::{ConnectionScope, PendingDispatch, PendingDispatches};
use super::topic::{TopicCell, topic_from_body};
use super::transport::{RegistrationTransport, TransportResponse};

/// Final result of one registration exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The daemon answered with a 2xx status.
    Accepted {
        /// HTTP status code.
        status: u16,
        /// Topic named in the reply body, if any.
        topic: Option<String>,
    },
    /// The daemon answered with any other status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reply body, lossily decoded.
        body: String,
    },
    /// The exchange did not produce a response.
    Failed(TransportError),
}

impl DispatchOutcome {
    fn from_response(response: &TransportResponse) -> Self {
        if response.is_success() {
            Self::Accepted {
                status: response.status,
                topic: topic_from_body(&response.body),
            }
        } else {
            Self::Rejected {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }
        }
    }
}

/// Receives completions for one connection.
pub trait CompletionHandler: Send + Sync {
    /// Called once per submission whose connection is still open.
    fn completed(&self, dispatch: PendingDispatch, outcome: &DispatchOutcome);
}

/// Hands registration payloads to a transport on a shared runtime.
pub struct RegistrationDispatcher<T> {
    transport: Arc<T>,
    endpoint: Url,
    runtime: Handle,
    pending: Arc<PendingDispatches>,
    topic: TopicCell,
    closed: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

impl<T: RegistrationTransport> RegistrationDispatcher<T> {
    /// Creates a dispatcher posting to `endpoint` via `transport`.
    #[must_use]
    pub fn new(
        transport: T,
        endpoint: Url,
        runtime: Handle,
        pending: Arc<PendingDispatches>,
        topic: TopicCell,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            endpoint,
            runtime,
            pending,
            topic,
            closed: AtomicBool::new(false),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Registry shared with the connections this dispatcher serves.
    #[must_use]
    pub const fn pending(&self) -> &Arc<PendingDispatches> {
        &self.pending
    }

    /// Topic reported to clients on success.
    #[must_use]
    pub const fn topic(&self) -> &TopicCell {
        &self.topic
    }

    /// Daemon endpoint registrations are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Number of exchanges still waiting on the transport.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stops accepting submissions. In-flight exchanges are unaffected.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Submits `payload` on behalf of `scope` without waiting for the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] once [`close`](Self::close) has been
    /// called and [`DispatchError::Encode`] if the payload cannot be
    /// serialised.
    pub fn submit(
        &self,
        scope: &ConnectionScope,
        payload: &RegistrationPayload,
    ) -> Result<PendingDispatch, DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }
        let body = payload.encode()?;
        debug!(
            target: DISPATCH_TARGET,
            connection = %scope.id(),
            endpoint = %self.endpoint,
            payload = %String::from_utf8_lossy(&body),
            "sending registration"
        );

        let dispatch = self.pending.register(scope);
        let exchange = Exchange {
            transport: Arc::clone(&self.transport),
            endpoint: self.endpoint.clone(),
            pending: Arc::clone(&self.pending),
            topic: self.topic.clone(),
            in_flight: Arc::clone(&self.in_flight),
            dispatch,
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(exchange.run(body));
        Ok(dispatch)
    }
}

/// State moved into the spawned task.
struct Exchange<T> {
    transport: Arc<T>,
    endpoint: Url,
    pending: Arc<PendingDispatches>,
    topic: TopicCell,
    in_flight: Arc<AtomicUsize>,
    dispatch: PendingDispatch,
}

impl<T: RegistrationTransport> Exchange<T> {
    async fn run(self, body: Vec<u8>) {
        let outcome = match self.transport.post_json(&self.endpoint, body).await {
            Ok(response) => DispatchOutcome::from_response(&response),
            Err(error) => DispatchOutcome::Failed(error),
        };
        self.record(&outcome);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        let token = self.dispatch.token();
        let Some(completion) = self.pending.claim(token) else {
            debug!(
                target: DISPATCH_TARGET,
                %token,
                connection = %self.dispatch.connection(),
                "connection closed before completion, discarding outcome"
            );
            return;
        };
        completion.completed(self.dispatch, &outcome);
    }

    /// Logs the outcome and captures any reported topic, whether or not the
    /// originating connection is still open.
    fn record(&self, outcome: &DispatchOutcome) {
        let token = self.dispatch.token();
        match outcome {
            DispatchOutcome::Accepted { status, topic } => {
                if let Some(reported) = topic {
                    self.topic.replace(reported.as_str());
                }
                info!(
                    target: DISPATCH_TARGET,
                    %token,
                    status,
                    topic = topic.as_deref().unwrap_or_default(),
                    "registration accepted"
                );
            }
            DispatchOutcome::Rejected { status, body } => {
                warn!(
                    target: DISPATCH_TARGET,
                    %token,
                    status,
                    body = body.as_str(),
                    "registration rejected by daemon"
                );
            }
            DispatchOutcome::Failed(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %token,
                    %error,
                    "registration request failed"
                );
            }
        }
    }
}
