//! `xapsd` binary: serves one pre-authenticated IMAP session on stdio.
//!
//! Failures are logged to stderr by the library before they reach here.

use std::process::ExitCode;

fn main() -> ExitCode {
    match xapsd::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
