//! Error types for instrument communication.
//!
//! Every failure mode of a session is represented as an explicit variant so
//! the caller decides what is fatal. The binary treats [`ScpiError::Connect`]
//! as a warning (queries against the dead session will fail soon enough) and
//! everything that happens mid-query as fatal.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the session error type.
pub type ScpiResult<T> = std::result::Result<T, ScpiError>;

/// Errors raised by an [`InstrumentSession`](crate::scpi::InstrumentSession).
#[derive(Debug, Error)]
pub enum ScpiError {
    /// The configured host/port pair is not a valid socket address.
    #[error("invalid instrument address {addr}: {source}")]
    Address {
        /// The address string that failed to parse.
        addr: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },

    /// TCP connect failed, or the greeting banner could not be read.
    #[error("failed to connect to instrument at {addr}: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An operation was attempted on a session with no live connection.
    #[error("session to {addr} is not connected")]
    NotConnected {
        /// Target address.
        addr: String,
    },

    /// Writing a command to the instrument failed.
    #[error("failed to send {command:?} to {addr}: {source}")]
    Send {
        /// Target address.
        addr: String,
        /// Lossy text rendering of the command that failed.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reading a response from the instrument failed.
    #[error("failed to read response from {addr}: {source}")]
    Receive {
        /// Target address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The instrument closed the connection while a response was expected.
    #[error("connection closed by instrument at {addr}")]
    ConnectionClosed {
        /// Target address.
        addr: String,
    },

    /// A configured timeout elapsed before the instrument responded.
    #[error("timed out after {timeout:?} waiting for instrument at {addr}")]
    Timeout {
        /// Target address.
        addr: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}
