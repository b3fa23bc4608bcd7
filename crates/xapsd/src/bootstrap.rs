//! Bridge bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tokio::runtime::Handle;
use url::Url;

use xaps_config::{Config, EndpointError, SettingsError};

use crate::dispatch::{PendingDispatches, RegistrationDispatcher, RegistrationTransport, TopicCell};
use crate::health::HealthReporter;
use crate::identity::{CallerIdentity, IdentityError};
use crate::session::Session;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the bridge configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config` so every load returns a copy of it.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A loaded setting cannot be served with.
    #[error("invalid configuration: {source}")]
    Settings {
        /// The rejected setting.
        #[source]
        source: SettingsError,
    },
    /// The registration endpoint could not be derived from the daemon URL.
    #[error("invalid registration endpoint: {source}")]
    Endpoint {
        /// Underlying endpoint error.
        #[source]
        source: EndpointError,
    },
    /// No caller identity could be established.
    #[error("failed to resolve caller identity: {source}")]
    Identity {
        /// Underlying identity error.
        #[source]
        source: IdentityError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Bridge {
    config: Config,
    endpoint: Url,
    caller: CallerIdentity,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Bridge {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute URL registrations are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Identity attached to every registration of this process.
    #[must_use]
    pub const fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter that observed bootstrap and receives shutdown events.
    #[must_use]
    pub const fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Builds a dispatcher with a fresh pending registry and topic cell.
    #[must_use]
    pub fn dispatcher<T: RegistrationTransport>(
        &self,
        transport: T,
        runtime: Handle,
    ) -> RegistrationDispatcher<T> {
        RegistrationDispatcher::new(
            transport,
            self.endpoint.clone(),
            runtime,
            Arc::new(PendingDispatches::new()),
            TopicCell::new(),
        )
    }

    /// Opens a session for the bootstrapped caller.
    #[must_use]
    pub fn open_session<T: RegistrationTransport>(
        &self,
        dispatcher: Arc<RegistrationDispatcher<T>>,
    ) -> Session<T> {
        Session::open(dispatcher, self.caller.clone(), self.config.push_capability())
    }
}

/// Bootstraps the bridge using the supplied collaborators.
///
/// `lookup` reads environment variables; it is used to resolve the caller
/// identity.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails. The reporter
/// sees the failure before it is returned.
pub fn bootstrap_with<F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    lookup: F,
) -> Result<Bridge, BootstrapError>
where
    F: Fn(&str) -> Option<String>,
{
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader.load().map_err(|source| {
        // Without a configuration the failure is logged with default settings.
        telemetry::initialise(&Config::default()).ok();
        fail(BootstrapError::Configuration { source })
    })?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    config
        .validate()
        .map_err(|source| fail(BootstrapError::Settings { source }))?;
    let endpoint = config
        .registration_endpoint()
        .map_err(|source| fail(BootstrapError::Endpoint { source }))?;
    let caller = CallerIdentity::resolve(&config, lookup)
        .map_err(|source| fail(BootstrapError::Identity { source }))?;

    reporter.bootstrap_succeeded(&config);
    Ok(Bridge {
        config,
        endpoint,
        caller,
        telemetry,
        reporter,
    })
}
