//! BDD world for registration scenarios: a session wired to a scripted
//! daemon on a private runtime.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use url::Url;
use xaps_config::PushCapability;

use crate::command::response::ResponseWriter;
use crate::dispatch::test_support::ScriptedTransport;
use crate::dispatch::{PendingDispatches, RegistrationDispatcher, TopicCell};
use crate::identity::CallerIdentity;
use crate::session::Session;

const WAIT: Duration = Duration::from_secs(5);

type Dispatcher = RegistrationDispatcher<ScriptedTransport>;

/// Scenario world shared across registration steps.
pub struct SessionWorld {
    runtime: Runtime,
    user: String,
    capability: PushCapability,
    transport: ScriptedTransport,
    dispatcher: Option<Arc<Dispatcher>>,
    session: Option<Session<ScriptedTransport>>,
    output: Vec<u8>,
}

impl SessionWorld {
    #[must_use]
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build test runtime");
        Self {
            runtime,
            user: "alice".to_owned(),
            capability: PushCapability::Advertise,
            transport: ScriptedTransport::replying(200, b"{}"),
            dispatcher: None,
            session: None,
            output: Vec::new(),
        }
    }

    pub fn set_user(&mut self, user: &str) {
        self.user = user.to_owned();
    }

    pub fn deny_capability(&mut self) {
        self.capability = PushCapability::Deny;
    }

    pub fn use_transport(&mut self, transport: ScriptedTransport) {
        self.transport = transport;
    }

    pub fn transport(&self) -> &ScriptedTransport {
        &self.transport
    }

    fn dispatcher(&mut self) -> Arc<Dispatcher> {
        let runtime = self.runtime.handle().clone();
        let transport = self.transport.clone();
        Arc::clone(self.dispatcher.get_or_insert_with(|| {
            Arc::new(RegistrationDispatcher::new(
                transport,
                Url::parse("http://127.0.0.1:11619/register").expect("endpoint"),
                runtime,
                Arc::new(PendingDispatches::new()),
                TopicCell::new(),
            ))
        }))
    }

    fn session(&mut self) -> &mut Session<ScriptedTransport> {
        if self.session.is_none() {
            let dispatcher = self.dispatcher();
            let caller = CallerIdentity::new(self.user.clone()).expect("identity");
            self.session = Some(Session::open(dispatcher, caller, self.capability));
        }
        self.session.as_mut().expect("session was just opened")
    }

    /// Feeds one client line to the session.
    pub fn send(&mut self, line: &str) {
        let mut output = std::mem::take(&mut self.output);
        {
            let mut writer = ResponseWriter::new(&mut output);
            self.session()
                .handle_line(line, &mut writer)
                .expect("session write failed");
        }
        self.output = output;
    }

    /// Closes the connection.
    pub fn close(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close();
        }
    }

    /// Response lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.output)
            .split_terminator("\r\n")
            .map(str::to_owned)
            .collect()
    }

    /// Blocks until the daemon has seen `count` requests.
    pub fn wait_for_requests(&self, count: usize) {
        self.transport.wait_for_requests(count, WAIT);
    }

    /// Releases held replies and waits for every exchange to settle.
    pub fn settle(&mut self) {
        self.transport.release();
        let dispatcher = self.dispatcher();
        let deadline = std::time::Instant::now() + WAIT;
        while dispatcher.in_flight() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        // Claiming happens right after the transport returns.
        std::thread::sleep(Duration::from_millis(50));
    }

    pub fn pending_count(&mut self) -> usize {
        self.dispatcher().pending().len()
    }

    pub fn topic(&mut self) -> String {
        self.dispatcher().topic().current()
    }
}

impl Default for SessionWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default registration world fixture.
#[must_use]
pub fn session_world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}
