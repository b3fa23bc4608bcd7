//! Test harness utilities for the bridge behavioural suites.

mod bootstrap_world;
mod reporter;
mod session_world;

pub use bootstrap_world::{BootstrapWorld, bootstrap_world};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use session_world::{SessionWorld, session_world};
