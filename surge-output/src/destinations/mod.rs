//! Concrete report writers

pub mod filesystem;
pub mod stdio;

pub use filesystem::{FilesystemConfig, FilesystemReportWriter};
pub use stdio::{StdStream, StdioReportWriter};
