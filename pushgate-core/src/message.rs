// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification Payload
//!
//! Convenience payload with the standard `aps` dictionary. Any other
//! `Serialize` value can be sent instead.

use serde::Serialize;
use serde_json::{Map, Value};

/// The `aps` dictionary understood by the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

/// A notification payload: `{"aps": {...}, <custom keys>}`.
///
/// # Example
///
/// ```ignore
/// let message = Message::alert("New contact").badge(1).sound("default");
/// let notification = Notification::new(token, &message)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub aps: Aps,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl Message {
    /// Creates an alert-only message.
    pub fn alert(text: impl Into<String>) -> Self {
        Message {
            aps: Aps {
                alert: Some(text.into()),
                ..Default::default()
            },
            custom: Map::new(),
        }
    }

    /// Sets the badge number.
    pub fn badge(mut self, badge: u32) -> Self {
        self.aps.badge = Some(badge);
        self
    }

    /// Sets the sound name.
    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.aps.sound = Some(sound.into());
        self
    }

    /// Adds an application-specific key next to `aps`.
    ///
    /// A key named `aps` is ignored so the dictionary cannot be shadowed.
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "aps" {
            self.custom.insert(key, value.into());
        }
        self
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::alert(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::alert(text)
    }
}
