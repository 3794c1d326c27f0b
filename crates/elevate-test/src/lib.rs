//! Elevate Test - Shared test utilities for the elevate engine.
//!
//! This crate provides in-memory fakes for the backend capability traits and
//! fixtures for policies, requests and approvals. Use it as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! elevate-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use elevate_test::{MockDirectory, MockIam, FixedClock, owner_policy_document};
//!
//! let directory = MockDirectory::new().with_member("alice@example.com", ["on-call@example.com"]);
//! let iam = MockIam::with_policy(owner_policy_document());
//! let clock = FixedClock::test_time();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Install a test subscriber that honours `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
