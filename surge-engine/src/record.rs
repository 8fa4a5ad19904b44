//! Per-request records produced by virtual users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a request counted as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ErrorKind {
    /// Target answered with a status >= 400
    Http(u16),
    /// Target answered with a status other than the scenario's expected one
    UnexpectedStatus(u16),
    Timeout,
    Network,
    /// The request could not be rendered or built
    InvalidRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Http(status) => write!(f, "http_{}", status),
            ErrorKind::UnexpectedStatus(status) => write!(f, "unexpected_{}", status),
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::Network => f.write_str("network"),
            ErrorKind::InvalidRequest => f.write_str("invalid_request"),
        }
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_status = |raw: &str| {
            raw.parse::<u16>()
                .map_err(|_| format!("Invalid status in error kind: {}", s))
        };

        match s {
            "timeout" => Ok(ErrorKind::Timeout),
            "network" => Ok(ErrorKind::Network),
            "invalid_request" => Ok(ErrorKind::InvalidRequest),
            _ => {
                if let Some(status) = s.strip_prefix("http_") {
                    Ok(ErrorKind::Http(parse_status(status)?))
                } else if let Some(status) = s.strip_prefix("unexpected_") {
                    Ok(ErrorKind::UnexpectedStatus(parse_status(status)?))
                } else {
                    Err(format!("Unknown error kind: {}", s))
                }
            }
        }
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for ErrorKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of one request issued by a virtual user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub response_time_ms: f64,
    /// Absent when no response arrived
    pub status_code: Option<u16>,
    /// Absent on success
    pub error_kind: Option<ErrorKind>,
    pub bytes_received: u64,
}

impl RequestRecord {
    pub fn success(
        scenario: impl Into<String>,
        started_at: DateTime<Utc>,
        response_time_ms: f64,
        status_code: u16,
        bytes_received: u64,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            started_at,
            response_time_ms,
            status_code: Some(status_code),
            error_kind: None,
            bytes_received,
        }
    }

    pub fn failure(
        scenario: impl Into<String>,
        started_at: DateTime<Utc>,
        response_time_ms: f64,
        status_code: Option<u16>,
        error_kind: ErrorKind,
        bytes_received: u64,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            started_at,
            response_time_ms,
            status_code,
            error_kind: Some(error_kind),
            bytes_received,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}
