// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Gateway Configuration

use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::certificate::CertificateProvider;

/// Sandbox gateway host.
pub const SANDBOX_HOST: &str = "gateway.sandbox.push.apple.com";
/// Production gateway host.
pub const PRODUCTION_HOST: &str = "gateway.push.apple.com";
/// Port of the binary notification gateway.
pub const GATEWAY_PORT: u16 = 2195;
/// Port of the feedback service.
pub const FEEDBACK_PORT: u16 = 2196;
/// Default number of delivery attempts per batch.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Configuration for the gateway client.
///
/// Built once and handed to the client; nothing here is global.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway host name.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Feedback host; derived from `host` when unset.
    pub feedback_host: Option<String>,
    /// Feedback port.
    pub feedback_port: u16,
    /// Path to the client certificate (PEM or PKCS#12).
    pub certificate_path: Option<PathBuf>,
    /// Client certificate bytes; preferred over `certificate_path`.
    pub certificate_data: Option<Zeroizing<Vec<u8>>>,
    /// Passphrase protecting the private key.
    pub passphrase: Option<Zeroizing<String>>,
    /// Total delivery attempts per batch, including the first.
    pub retry_limit: u32,
    /// Keep the gateway connection open between sends.
    pub persistent: bool,
    /// TCP connect timeout in milliseconds. `None` blocks indefinitely.
    pub connect_timeout_ms: Option<u64>,
    /// Socket read/write timeout in milliseconds. `None` blocks indefinitely.
    pub io_timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: SANDBOX_HOST.to_string(),
            port: GATEWAY_PORT,
            feedback_host: None,
            feedback_port: FEEDBACK_PORT,
            certificate_path: None,
            certificate_data: None,
            passphrase: None,
            retry_limit: DEFAULT_RETRY_LIMIT,
            persistent: false,
            connect_timeout_ms: None,
            io_timeout_ms: None,
        }
    }
}

impl GatewayConfig {
    /// Config for the sandbox (development) gateway.
    pub fn sandbox() -> Self {
        Self::default()
    }

    /// Config for the production gateway.
    pub fn production() -> Self {
        GatewayConfig {
            host: PRODUCTION_HOST.to_string(),
            ..Default::default()
        }
    }

    /// Reads the certificate from a file.
    pub fn with_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Uses certificate bytes already in memory.
    pub fn with_certificate_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.certificate_data = Some(Zeroizing::new(data.into()));
        self
    }

    /// Sets the private key passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
        self
    }

    /// Sets the total number of delivery attempts per batch.
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Starts with persistence mode enabled.
    pub fn with_persistence(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Overrides the derived feedback endpoint.
    pub fn with_feedback_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.feedback_host = Some(host.into());
        self.feedback_port = port;
        self
    }

    /// Sets transport-level socket timeouts.
    pub fn with_timeouts(mut self, connect_timeout_ms: u64, io_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(connect_timeout_ms);
        self.io_timeout_ms = Some(io_timeout_ms);
        self
    }

    /// Returns the feedback host.
    ///
    /// Unless overridden, every `gateway` in the gateway host name is
    /// replaced with `feedback`.
    pub fn feedback_host(&self) -> String {
        self.feedback_host
            .clone()
            .unwrap_or_else(|| self.host.replace("gateway", "feedback"))
    }

    /// Builds a certificate provider from the configured source.
    pub fn certificate_provider(&self) -> CertificateProvider {
        CertificateProvider::new(self.certificate_path.clone(), self.certificate_data.clone())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("feedback_host", &self.feedback_host)
            .field("feedback_port", &self.feedback_port)
            .field("certificate_path", &self.certificate_path)
            .field(
                "certificate_data",
                &self.certificate_data.as_ref().map(|_| "<redacted>"),
            )
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("retry_limit", &self.retry_limit)
            .field("persistent", &self.persistent)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("io_timeout_ms", &self.io_timeout_ms)
            .finish()
    }
}
