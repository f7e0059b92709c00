// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared fixtures and helpers used across test modules.

#![allow(dead_code)]

pub mod strategies;

use pushgate_core::{
    ConnectionManager, Endpoint, MockSessionFactory, Notification, FEEDBACK_RECORD_SIZE,
};

/// A valid 32-byte device token.
pub const TOKEN: &str = "00fc13adff785122b4ad28809a3420982341241421348097878e577c991de8f0";

/// Endpoint used by mock-backed managers.
pub fn gateway_endpoint() -> Endpoint {
    Endpoint::new("gateway.test", 2195)
}

/// Creates a manager over a clone of `factory`.
pub fn manager(
    factory: &MockSessionFactory,
    retry_limit: u32,
) -> ConnectionManager<MockSessionFactory> {
    ConnectionManager::new(factory.clone(), gateway_endpoint(), retry_limit, false)
}

/// Creates a notification with a raw payload.
pub fn notification(payload: &str) -> Notification {
    Notification::from_payload(TOKEN, payload.as_bytes().to_vec()).unwrap()
}

/// Creates `count` notifications with payloads `{"n":0}`, `{"n":1}`, ...
pub fn batch(count: usize) -> Vec<Notification> {
    (0..count)
        .map(|i| notification(&format!("{{\"n\":{}}}", i)))
        .collect()
}

/// Builds one raw feedback record.
pub fn feedback_record(timestamp: u32, token: &[u8; 32]) -> [u8; FEEDBACK_RECORD_SIZE] {
    let mut record = [0u8; FEEDBACK_RECORD_SIZE];
    record[..4].copy_from_slice(&timestamp.to_be_bytes());
    record[4..6].copy_from_slice(&32u16.to_be_bytes());
    record[6..].copy_from_slice(token);
    record
}
