// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

/// Strategy for hex device tokens of 1 to 64 bytes.
pub fn device_token_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 1..=64).prop_map(hex::encode)
}

/// Strategy for standard 32-byte raw tokens.
pub fn raw_token_strategy() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// Strategy for payload bytes, including oversized ones.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for alert texts.
pub fn alert_strategy() -> impl Strategy<Value = String> {
    ".{0,120}"
}
