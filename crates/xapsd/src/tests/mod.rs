//! Test suites for the push registration bridge.

mod support;
