// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pushgate Core Library
//!
//! Client for the binary push-notification gateway and its feedback service.
//!
//! # Architecture
//!
//! - **Certificate provider**: loads the client certificate once, from disk or memory
//! - **Session factory**: opens mutually authenticated TLS sessions
//! - **Notification encoder**: builds the gateway's binary frames
//! - **Connection manager**: one shared session behind one lock, with
//!   bounded reconnect-and-retry and optional persistence
//! - **Feedback reader**: one-shot reader for tokens to stop targeting
//!
//! The TLS backend is chosen with the `tls-rustls` (default) or
//! `tls-native` feature. Without either, the transport-independent parts
//! remain available and run against any [`SessionFactory`].

pub mod certificate;
pub mod config;
pub mod connection;
pub mod error;
pub mod feedback;
pub mod message;
pub mod notification;
pub mod transport;

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(all(test, not(feature = "testing")))]
mod mock;

#[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
pub mod client;
#[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
pub mod tls;

pub use certificate::{
    pem_sections, private_key_der, CertificateBytes, CertificateFormat, CertificateProvider,
};
pub use config::{
    GatewayConfig, DEFAULT_RETRY_LIMIT, FEEDBACK_PORT, GATEWAY_PORT, PRODUCTION_HOST, SANDBOX_HOST,
};
pub use connection::ConnectionManager;
pub use error::{PushError, PushResult};
pub use feedback::{
    decode_record, FeedbackReader, FeedbackRecord, FeedbackRecords, FEEDBACK_RECORD_SIZE,
    FEEDBACK_TOKEN_SIZE,
};
pub use message::{Aps, Message};
pub use notification::{
    encode_frame, parse_device_token, Notification, COMMAND_SIMPLE, FRAME_OVERHEAD,
    MAX_FRAME_SIZE,
};
pub use transport::{ConnectionState, Endpoint, GatewaySession, SessionFactory};

#[cfg(feature = "testing")]
pub use mock::{MockSession, MockSessionFactory};

#[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
pub use client::PushClient;
#[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
pub use tls::{TlsSession, TlsSessionFactory};
