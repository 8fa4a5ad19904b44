//! Logging initialisation for Surge
//!
//! Library crates log through `tracing` macros; the binary calls one of the
//! functions here once at startup to install a `tracing-subscriber`
//! formatter filtered by the configured level.

pub mod init;

pub use init::{filter_directive, init_logging_from_config, init_simple_tracing};
