// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for gateway configuration

use pushgate_core::*;

#[test]
fn test_config_defaults() {
    let config = GatewayConfig::default();

    assert_eq!(config.host, "gateway.sandbox.push.apple.com");
    assert_eq!(config.port, 2195);
    assert_eq!(config.feedback_port, 2196);
    assert_eq!(config.retry_limit, 3);
    assert!(!config.persistent);
    assert!(config.certificate_path.is_none());
    assert!(config.certificate_data.is_none());
    assert!(config.passphrase.is_none());
    assert_eq!(config.connect_timeout_ms, None);
    assert_eq!(config.io_timeout_ms, None);
}

#[test]
fn test_feedback_host_derived_from_gateway() {
    assert_eq!(
        GatewayConfig::sandbox().feedback_host(),
        "feedback.sandbox.push.apple.com"
    );
    assert_eq!(
        GatewayConfig::production().feedback_host(),
        "feedback.push.apple.com"
    );
}

#[test]
fn test_feedback_endpoint_override() {
    let config = GatewayConfig::production().with_feedback_endpoint("localhost", 12196);
    assert_eq!(config.feedback_host(), "localhost");
    assert_eq!(config.feedback_port, 12196);
}

#[test]
fn test_builder_methods() {
    let config = GatewayConfig::production()
        .with_certificate_path("/etc/push/cert.pem")
        .with_passphrase("secret")
        .with_retry_limit(5)
        .with_persistence()
        .with_timeouts(2_000, 10_000);

    assert_eq!(config.host, PRODUCTION_HOST);
    assert_eq!(
        config.certificate_path.as_deref(),
        Some(std::path::Path::new("/etc/push/cert.pem"))
    );
    assert_eq!(config.passphrase.as_deref().map(String::as_str), Some("secret"));
    assert_eq!(config.retry_limit, 5);
    assert!(config.persistent);
    assert_eq!(config.connect_timeout_ms, Some(2_000));
    assert_eq!(config.io_timeout_ms, Some(10_000));
}

#[test]
fn test_debug_redacts_secrets() {
    let config = GatewayConfig::sandbox()
        .with_certificate_data(b"PRIVATE-KEY-MATERIAL".to_vec())
        .with_passphrase("hunter2");
    let debug = format!("{:?}", config);

    assert!(!debug.contains("hunter2"));
    assert!(!debug.contains("PRIVATE-KEY-MATERIAL"));
    assert!(debug.contains("gateway.sandbox.push.apple.com"));
}

#[test]
fn test_certificate_provider_prefers_data() {
    let config = GatewayConfig::sandbox()
        .with_certificate_path("/nonexistent.pem")
        .with_certificate_data(b"cert".to_vec());
    let provider = config.certificate_provider();
    assert_eq!(provider.resolve().unwrap().as_slice(), b"cert");
}
