// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification Encoding
//!
//! Binary frame layout written to the gateway:
//!
//! ```text
//! +---------+--------------+-------------+----------------+-----------+
//! | cmd (1) | tok_len (2)  | token (n)   | payload_len (2)| payload   |
//! | 0x00    | big-endian   | raw bytes   | big-endian     | JSON      |
//! +---------+--------------+-------------+----------------+-----------+
//! ```

use serde::Serialize;

use crate::error::{PushError, PushResult};

/// Command byte of the simple notification format.
pub const COMMAND_SIMPLE: u8 = 0;

/// Bytes of framing around token and payload: command + two length fields.
pub const FRAME_OVERHEAD: usize = 5;

/// Historical per-notification ceiling enforced by the gateway.
///
/// The encoder does not enforce it; see [`Notification::exceeds_gateway_limit`].
pub const MAX_FRAME_SIZE: usize = 256;

/// Encodes a raw device token and payload into one gateway frame.
///
/// Fails only when a length does not fit the 16-bit length fields.
pub fn encode_frame(token: &[u8], payload: &[u8]) -> PushResult<Vec<u8>> {
    let token_len = field_len("device token", token)?;
    let payload_len = field_len("payload", payload)?;
    Ok(write_frame(token, token_len, payload, payload_len))
}

fn field_len(field: &'static str, bytes: &[u8]) -> PushResult<u16> {
    u16::try_from(bytes.len()).map_err(|_| PushError::PayloadTooLarge {
        field,
        len: bytes.len(),
    })
}

fn write_frame(token: &[u8], token_len: u16, payload: &[u8], payload_len: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + token.len() + payload.len());
    frame.push(COMMAND_SIMPLE);
    frame.extend_from_slice(&token_len.to_be_bytes());
    frame.extend_from_slice(token);
    frame.extend_from_slice(&payload_len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Decodes a hex device token, ignoring whitespace and angle brackets.
///
/// Accepts tokens as they are commonly printed, e.g. `<abcd 1234 ...>`.
pub fn parse_device_token(token: &str) -> PushResult<Vec<u8>> {
    let cleaned: String = token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
        .collect();
    if cleaned.is_empty() {
        return Err(PushError::InvalidToken("empty device token".into()));
    }
    hex::decode(&cleaned).map_err(|e| PushError::InvalidToken(format!("{}: {}", cleaned, e)))
}

/// A notification ready to be framed for the gateway.
///
/// Immutable once built; the token and payload lengths are validated on
/// construction so encoding cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    token: Vec<u8>,
    payload: Vec<u8>,
}

impl Notification {
    /// Creates a notification, serializing `message` as JSON.
    pub fn new<M: Serialize + ?Sized>(device_token: &str, message: &M) -> PushResult<Self> {
        let payload = serde_json::to_vec(message)?;
        Self::from_payload(device_token, payload)
    }

    /// Creates a notification from an already encoded payload.
    pub fn from_payload(device_token: &str, payload: impl Into<Vec<u8>>) -> PushResult<Self> {
        let token = parse_device_token(device_token)?;
        let payload = payload.into();
        field_len("device token", &token)?;
        field_len("payload", &payload)?;
        Ok(Notification { token, payload })
    }

    /// Returns the device token as lowercase hex.
    pub fn device_token(&self) -> String {
        hex::encode(&self.token)
    }

    /// Returns the raw token bytes.
    pub fn token_bytes(&self) -> &[u8] {
        &self.token
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of the encoded frame in bytes.
    pub fn frame_len(&self) -> usize {
        FRAME_OVERHEAD + self.token.len() + self.payload.len()
    }

    /// Returns true if the frame is larger than the gateway accepts.
    pub fn exceeds_gateway_limit(&self) -> bool {
        self.frame_len() > MAX_FRAME_SIZE
    }

    /// Encodes this notification into a gateway frame.
    pub fn encode(&self) -> Vec<u8> {
        // Lengths were checked in from_payload.
        write_frame(
            &self.token,
            self.token.len() as u16,
            &self.payload,
            self.payload.len() as u16,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "00fc13adff785122b4ad28809a3420982341241421348097878e577c991de8f0";

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(&[0xAB, 0xCD], b"{}").unwrap();
        assert_eq!(frame, vec![0x00, 0x00, 0x02, 0xAB, 0xCD, 0x00, 0x02, b'{', b'}']);
    }

    #[test]
    fn test_parse_token_strips_brackets_and_spaces() {
        let token = parse_device_token("<00fc13ad ff785122>").unwrap();
        assert_eq!(token, vec![0x00, 0xfc, 0x13, 0xad, 0xff, 0x78, 0x51, 0x22]);
    }

    #[test]
    fn test_parse_token_rejects_non_hex() {
        let result = parse_device_token("not-a-token");
        assert!(matches!(result, Err(PushError::InvalidToken(_))));
    }

    #[test]
    fn test_parse_token_rejects_empty() {
        let result = parse_device_token(" <> ");
        assert!(matches!(result, Err(PushError::InvalidToken(_))));
    }

    #[test]
    fn test_notification_serializes_message() {
        let n = Notification::new(TOKEN, &serde_json::json!({"aps": {"alert": "hi"}})).unwrap();
        assert_eq!(n.payload(), br#"{"aps":{"alert":"hi"}}"#);
        assert_eq!(n.token_bytes().len(), 32);
        assert_eq!(n.device_token(), TOKEN);
    }

    #[test]
    fn test_oversized_frame_passes_through() {
        let payload = vec![b'x'; 400];
        let n = Notification::from_payload(TOKEN, payload.clone()).unwrap();
        assert!(n.exceeds_gateway_limit());

        let frame = n.encode();
        assert_eq!(frame.len(), FRAME_OVERHEAD + 32 + 400);
        assert_eq!(&frame[frame.len() - 400..], payload.as_slice());
    }

    #[test]
    fn test_payload_over_u16_rejected() {
        let payload = vec![0u8; u16::MAX as usize + 1];
        let result = Notification::from_payload(TOKEN, payload);
        assert!(matches!(
            result,
            Err(PushError::PayloadTooLarge { field: "payload", .. })
        ));
    }

    #[test]
    fn test_encode_matches_free_function() {
        let n = Notification::from_payload(TOKEN, b"{\"a\":1}".to_vec()).unwrap();
        assert_eq!(n.encode(), encode_frame(n.token_bytes(), n.payload()).unwrap());
        assert_eq!(n.encode().len(), n.frame_len());
    }
}
