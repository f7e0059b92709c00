// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Gateway Error Types
//!
//! Error types for certificate loading, connection and delivery.

use thiserror::Error;

/// Result type for gateway operations.
pub type PushResult<T> = Result<T, PushError>;

/// Errors produced by the gateway client.
#[derive(Error, Debug, Clone)]
pub enum PushError {
    /// Certificate source is missing, unreadable or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Socket connect, TLS handshake or a feedback read failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Write to an established session failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Retry limit exhausted; wraps the last failure seen.
    #[error("Delivery failed after {attempts} attempt(s): {last}")]
    DeliveryFailed { attempts: u32, last: Box<PushError> },

    #[error("Invalid device token: {0}")]
    InvalidToken(String),

    #[error("{field} too large for frame: {len} bytes")]
    PayloadTooLarge { field: &'static str, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PushError {
    /// Returns true for I/O failures that a fresh connection may fix.
    ///
    /// Only these enter the reconnect-and-retry loop; everything else is
    /// returned to the caller immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PushError::ConnectionFailed(_) | PushError::WriteFailed(_)
        )
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        PushError::Serialization(err.to_string())
    }
}
