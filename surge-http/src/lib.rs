//! HTTP functionality for Surge
//!
//! This crate provides the HTTP method type used by scenario templates, the
//! client configuration, and the [`Transport`] seam through which every
//! load-test request is sent. [`ReqwestTransport`] is the production
//! implementation; tests substitute their own transports.

pub mod config;
pub mod errors;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::HttpConfig;
pub use errors::{HttpError, TransportError};
pub use transport::{PreparedRequest, RequestBody, ReqwestTransport, Transport, TransportResponse};
pub use types::{HttpMethod, HttpMethodError};
