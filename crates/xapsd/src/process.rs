//! Process entry point: runtime ownership and the stdio session.

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{error, info};

use crate::bootstrap::{BootstrapError, Bridge, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{HttpTransport, RegistrationTransport, TransportError};
use crate::health::{HealthReporter, StructuredHealthReporter};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Worker threads driving outbound registrations.
const DISPATCH_WORKERS: usize = 2;

/// Errors surfaced while running the bridge process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The dispatch runtime could not be started.
    #[error("failed to start dispatch runtime: {source}")]
    Runtime {
        /// Underlying runtime builder error.
        #[source]
        source: io::Error,
    },
    /// The HTTP client could not be built.
    #[error("failed to initialise HTTP transport: {source}")]
    Transport {
        /// Underlying client construction error.
        #[source]
        source: TransportError,
    },
    /// Reading from or writing to the client failed.
    #[error("session I/O failed: {source}")]
    Session {
        /// Underlying stream error.
        #[source]
        source: io::Error,
    },
}

/// Runs the bridge on stdin/stdout using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails or the session stream breaks.
pub fn run_bridge() -> Result<(), LaunchError> {
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let bridge = bootstrap_with(&SystemConfigLoader, reporter, |name| env::var(name).ok())?;
    let runtime = build_runtime().map_err(logged)?;
    let transport = HttpTransport::new(bridge.config().http_timeout())
        .map_err(|source| logged(LaunchError::Transport { source }))?;
    serve(
        &bridge,
        runtime,
        transport,
        io::stdin().lock(),
        io::stdout().lock(),
    )
    .map_err(logged)
}

// Bootstrap failures are reported by the health reporter; everything later
// is logged here.
fn logged(failure: LaunchError) -> LaunchError {
    error!(target: PROCESS_TARGET, error = %failure, "bridge stopped");
    failure
}

/// Runs the bridge with injected collaborators.
///
/// # Errors
///
/// See [`run_bridge`].
pub fn run_bridge_with<L, T, R, W, F>(
    loader: &L,
    reporter: Arc<dyn HealthReporter>,
    lookup: F,
    transport: T,
    reader: R,
    writer: W,
) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    T: RegistrationTransport,
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Option<String>,
{
    let bridge = bootstrap_with(loader, reporter, lookup)?;
    let runtime = build_runtime()?;
    serve(&bridge, runtime, transport, reader, writer)
}

fn build_runtime() -> Result<Runtime, LaunchError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(DISPATCH_WORKERS)
        .thread_name("xapsd-dispatch")
        .enable_all()
        .build()
        .map_err(|source| LaunchError::Runtime { source })
}

fn serve<T, R, W>(
    bridge: &Bridge,
    runtime: Runtime,
    transport: T,
    reader: R,
    writer: W,
) -> Result<(), LaunchError>
where
    T: RegistrationTransport,
    R: BufRead,
    W: Write,
{
    let dispatcher = Arc::new(bridge.dispatcher(transport, runtime.handle().clone()));
    info!(
        target: PROCESS_TARGET,
        endpoint = %dispatcher.endpoint(),
        user = %bridge.caller(),
        "serving session on stdio"
    );
    let result = bridge
        .open_session(Arc::clone(&dispatcher))
        .run(reader, writer);

    dispatcher.close();
    bridge.reporter().shutdown_starting(dispatcher.in_flight());
    drop(dispatcher);
    // Registrations already sent get the transport timeout to finish.
    runtime.shutdown_timeout(bridge.config().http_timeout());
    bridge.reporter().shutdown_completed();

    result.map_err(|source| LaunchError::Session { source })
}
