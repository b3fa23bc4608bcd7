//! Registry of in-flight registrations.
//!
//! Each submission registers a token against the connection that issued it.
//! Completions claim their token before running; tearing a connection down
//! removes its tokens so late completions find nothing to claim.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use super::dispatcher::CompletionHandler;

/// Identifier of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "conn-{}", self.0)
    }
}

/// Opaque correlation token for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchToken(Uuid);

impl DispatchToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DispatchToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Handle correlating a submitted request with its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDispatch {
    token: DispatchToken,
    connection: ConnectionId,
}

impl PendingDispatch {
    /// Token the completion is claimed with.
    #[must_use]
    pub const fn token(&self) -> DispatchToken {
        self.token
    }

    /// Connection that submitted the registration.
    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }
}

/// A connection's identity plus the handler its completions go to.
#[derive(Clone)]
pub struct ConnectionScope {
    id: ConnectionId,
    completion: Arc<dyn CompletionHandler>,
}

impl ConnectionScope {
    /// Identifier allocated by [`PendingDispatches::open_connection`].
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl fmt::Debug for ConnectionScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionScope")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

struct PendingEntry {
    connection: ConnectionId,
    completion: Arc<dyn CompletionHandler>,
}

/// Shared registry of pending dispatches.
#[derive(Default)]
pub struct PendingDispatches {
    entries: DashMap<DispatchToken, PendingEntry>,
    next_connection: AtomicU64,
}

impl PendingDispatches {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a connection scope whose completions go to `completion`.
    #[must_use]
    pub fn open_connection(&self, completion: Arc<dyn CompletionHandler>) -> ConnectionScope {
        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        ConnectionScope { id, completion }
    }

    /// Registers a new submission for `scope`.
    pub(crate) fn register(&self, scope: &ConnectionScope) -> PendingDispatch {
        let dispatch = PendingDispatch {
            token: DispatchToken::generate(),
            connection: scope.id,
        };
        self.entries.insert(
            dispatch.token,
            PendingEntry {
                connection: scope.id,
                completion: Arc::clone(&scope.completion),
            },
        );
        dispatch
    }

    /// Claims the completion handler for `token`, removing the entry.
    pub(crate) fn claim(&self, token: DispatchToken) -> Option<Arc<dyn CompletionHandler>> {
        self.entries
            .remove(&token)
            .map(|(_, entry)| entry.completion)
    }

    /// Drops every pending entry owned by `connection`.
    ///
    /// Returns the number of entries removed.
    #[must_use = "the count says how many late completions will be discarded"]
    pub fn invalidate_connection(&self, connection: ConnectionId) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.connection != connection;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Whether `token` is still awaiting completion.
    #[must_use]
    pub fn is_pending(&self, token: DispatchToken) -> bool {
        self.entries.contains_key(&token)
    }

    /// Number of registrations awaiting completion.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is awaiting completion.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PendingDispatches {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PendingDispatches")
            .field("pending", &self.entries.len())
            .finish_non_exhaustive()
    }
}
