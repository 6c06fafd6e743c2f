//! Shared infrastructure for scenesync components.
//!
//! Currently this hosts the logging configuration used by every binary in the
//! workspace. Keep this crate free of domain types so that tools depending on
//! it never pull in the sync pipeline itself.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
