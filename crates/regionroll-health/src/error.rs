//! Probe error types.

use std::time::Duration;

use thiserror::Error;

/// Why a region could not be queried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("http handshake with {address} failed: {reason}")]
    Handshake { address: String, reason: String },

    #[error("request to {uri} failed: {reason}")]
    Request { uri: String, reason: String },

    #[error("request to {uri} timed out after {timeout:?}")]
    Timeout { uri: String, timeout: Duration },

    #[error("{uri} returned status {status}")]
    Status { uri: String, status: u16 },

    #[error("invalid response from {uri}: {reason}")]
    Decode { uri: String, reason: String },
}
