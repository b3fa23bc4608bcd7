//! BDD world for bridge bootstrap: a static configuration, a recording
//! reporter and a fake environment.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use xaps_config::Config;

use crate::bootstrap::{BootstrapError, Bridge, StaticConfigLoader, bootstrap_with};

use super::reporter::RecordingHealthReporter;

/// Scenario world shared across bootstrap steps.
pub struct BootstrapWorld {
    config: Config,
    environment: HashMap<String, String>,
    pub reporter: Arc<RecordingHealthReporter>,
    bridge: Option<Bridge>,
    bootstrap_error: Option<BootstrapError>,
}

impl BootstrapWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            environment: HashMap::new(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            bridge: None,
            bootstrap_error: None,
        }
    }

    /// Points the configuration at another daemon.
    pub fn set_daemon_url(&mut self, url: &str) {
        url.clone_into(&mut self.config.daemon_url);
        self.reset_results();
    }

    pub fn set_http_timeout_ms(&mut self, millis: u64) {
        self.config.http_timeout_ms = millis;
        self.reset_results();
    }

    pub fn set_user_lookup(&mut self, variable: &str) {
        self.config.user_lookup = Some(variable.to_owned());
        self.reset_results();
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.environment.insert(name.to_owned(), value.to_owned());
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.bridge.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let loader = StaticConfigLoader::new(self.config.clone());
        let environment = &self.environment;
        match bootstrap_with(&loader, self.reporter.clone(), |name| {
            environment.get(name).cloned()
        }) {
            Ok(bridge) => self.bridge = Some(bridge),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    #[must_use]
    pub fn bridge(&self) -> Option<&Bridge> {
        self.bridge.as_ref()
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    fn reset_results(&mut self) {
        self.bridge = None;
        self.bootstrap_error = None;
    }
}

impl Default for BootstrapWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default bootstrap world fixture.
#[must_use]
pub fn bootstrap_world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}
