// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Push Client
//!
//! Entry point tying configuration, certificate, gateway connection and
//! feedback reader together.

use std::sync::Arc;

use serde::Serialize;

use crate::certificate::CertificateProvider;
use crate::config::GatewayConfig;
use crate::connection::ConnectionManager;
use crate::error::PushResult;
use crate::feedback::{FeedbackReader, FeedbackRecord};
use crate::notification::Notification;
use crate::tls::TlsSessionFactory;
use crate::transport::ConnectionState;

/// Client for the notification gateway and feedback service.
///
/// Both services share one certificate provider, so the certificate file
/// is read once.
///
/// # Example
///
/// ```ignore
/// use pushgate_core::{GatewayConfig, Message, PushClient};
///
/// let config = GatewayConfig::production()
///     .with_certificate_path("/etc/push/cert.pem");
/// let client = PushClient::new(config);
///
/// client.send_notification(device_token, &Message::alert("Hello"))?;
///
/// for record in client.feedback()? {
///     forget_device(&record.device_token);
/// }
/// ```
pub struct PushClient {
    config: GatewayConfig,
    gateway: ConnectionManager<TlsSessionFactory>,
    feedback: FeedbackReader<TlsSessionFactory>,
}

impl PushClient {
    /// Creates a client. Nothing is read or connected until first use.
    pub fn new(config: GatewayConfig) -> Self {
        let certificate = Arc::new(config.certificate_provider());
        let gateway = ConnectionManager::from_config(
            TlsSessionFactory::from_config(&config, Arc::clone(&certificate)),
            &config,
        );
        let feedback = FeedbackReader::from_config(
            TlsSessionFactory::from_config(&config, certificate),
            &config,
        );

        PushClient {
            config,
            gateway,
            feedback,
        }
    }

    /// Returns the configuration the client was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the shared certificate provider.
    pub fn certificate(&self) -> &Arc<CertificateProvider> {
        self.gateway.factory().certificate()
    }

    /// Serializes `message` and sends it to one device.
    pub fn send_notification<M: Serialize + ?Sized>(
        &self,
        device_token: &str,
        message: &M,
    ) -> PushResult<()> {
        let notification = Notification::new(device_token, message)?;
        self.gateway.send_notification(&notification)
    }

    /// Sends a batch of notifications over one connection.
    pub fn send_notifications(&self, notifications: &[Notification]) -> PushResult<()> {
        self.gateway.send_notifications(notifications)
    }

    /// Keeps the gateway connection open between sends.
    pub fn start_persistence(&self) {
        self.gateway.start_persistence();
    }

    /// Stops persistence and closes the gateway connection.
    pub fn stop_persistence(&self) {
        self.gateway.stop_persistence();
    }

    /// Returns the gateway connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.gateway.state()
    }

    /// Reads the device tokens reported by the feedback service.
    pub fn feedback(&self) -> PushResult<Vec<FeedbackRecord>> {
        self.feedback.read_feedback()
    }
}
