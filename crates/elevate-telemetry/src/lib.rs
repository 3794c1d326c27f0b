//! Elevate Telemetry - Logging for the elevate privilege grant engine.
//!
//! Installs a global `tracing` subscriber in one of three formats, writing
//! to stdout, stderr, or a daily-rotated file. Audit records are ordinary
//! `warn` events under the `elevate::audit` target, so a directive such as
//! `elevate::audit=off` silences them like any other target.
//!
//! # Example
//!
//! ```rust,no_run
//! use elevate_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), elevate_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("elevate_approval=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
