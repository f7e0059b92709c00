// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Traits
//!
//! Abstraction over how gateway sessions are opened, so the connection
//! manager and feedback reader can run against TLS or an in-memory mock.

use std::fmt;
use std::io::{self, Read, Write};

use crate::error::PushResult;

/// State of the shared gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session.
    Closed,
    /// Session live; closed after the current batch.
    Open,
    /// Session live and kept across batches.
    PersistentOpen,
}

/// Host and port of a remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An authenticated byte stream to the gateway or feedback service.
///
/// The TLS layer and the socket underneath it are one unit: they are
/// opened together by [`SessionFactory::open`] and shut down together by
/// [`GatewaySession::close`].
pub trait GatewaySession: Read + Write + Send {
    /// Shuts down the TLS layer, then the socket.
    ///
    /// Safe to call more than once.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens new sessions to a remote endpoint.
///
/// Implementations perform the full handshake before returning and never
/// retry; retry policy belongs to the caller.
pub trait SessionFactory: Send + Sync {
    /// Session type produced by this factory.
    type Session: GatewaySession;

    /// Opens a session to `endpoint`.
    ///
    /// Returns `PushError::Configuration` when credentials are unusable and
    /// `PushError::ConnectionFailed` when the socket or handshake fails.
    fn open(&self, endpoint: &Endpoint) -> PushResult<Self::Session>;
}
