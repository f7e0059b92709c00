// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Feedback Reader
//!
//! The feedback service streams fixed-size records naming device tokens
//! that no longer accept notifications, then closes the connection:
//!
//! ```text
//! +---------------+--------------+----------------------+
//! | timestamp (4) | tok_len (2)  | token (32)           |
//! | u32 BE, secs  | u16 BE, = 32 | raw bytes            |
//! +---------------+--------------+----------------------+
//! ```

use std::io::{self, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use crate::config::GatewayConfig;
use crate::error::{PushError, PushResult};
use crate::transport::{Endpoint, GatewaySession, SessionFactory};

/// Size of one feedback record in bytes.
pub const FEEDBACK_RECORD_SIZE: usize = 38;

/// Size of the token carried in a feedback record.
pub const FEEDBACK_TOKEN_SIZE: usize = 32;

/// A device token reported by the feedback service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    /// When the service determined the app was gone, in seconds since the epoch.
    pub timestamp: u64,
    /// Device token as lowercase hex.
    pub device_token: String,
}

impl FeedbackRecord {
    /// Returns the timestamp as a `SystemTime`.
    pub fn time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.timestamp)
    }
}

/// Decodes one feedback record.
///
/// The token length field is honoured up to [`FEEDBACK_TOKEN_SIZE`] bytes.
pub fn decode_record(record: &[u8; FEEDBACK_RECORD_SIZE]) -> FeedbackRecord {
    let timestamp = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
    let token_len = u16::from_be_bytes([record[4], record[5]]) as usize;

    if token_len != FEEDBACK_TOKEN_SIZE {
        warn!(token_len, "unexpected token length in feedback record");
    }
    let token = &record[6..6 + token_len.min(FEEDBACK_TOKEN_SIZE)];

    FeedbackRecord {
        timestamp: u64::from(timestamp),
        device_token: hex::encode(token),
    }
}

/// Lazy iterator over the records in a feedback stream.
///
/// Ends at end of stream; a trailing partial record is discarded. After
/// an error it yields nothing more.
pub struct FeedbackRecords<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> FeedbackRecords<R> {
    pub fn new(reader: R) -> Self {
        FeedbackRecords {
            reader,
            done: false,
        }
    }

    /// Fills `buf` with one record. Returns `Ok(false)` at end of stream.
    fn read_record(&mut self, buf: &mut [u8; FEEDBACK_RECORD_SIZE]) -> io::Result<bool> {
        let mut filled = 0;
        while filled < FEEDBACK_RECORD_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled > 0 {
                        trace!(bytes = filled, "discarding partial feedback record");
                    }
                    return Ok(false);
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // Peer closed the TLS stream without close_notify
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for FeedbackRecords<R> {
    type Item = PushResult<FeedbackRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = [0u8; FEEDBACK_RECORD_SIZE];
        match self.read_record(&mut buf) {
            Ok(true) => Some(Ok(decode_record(&buf))),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(PushError::ConnectionFailed(format!(
                    "feedback read failed: {}",
                    e
                ))))
            }
        }
    }
}

/// One-shot reader for the feedback service.
///
/// Each call opens its own session, so readers need no locking and may run
/// alongside sends and each other. Failures are returned as-is; there is
/// no retry.
pub struct FeedbackReader<F: SessionFactory> {
    factory: F,
    endpoint: Endpoint,
}

impl<F: SessionFactory> FeedbackReader<F> {
    /// Creates a reader for `endpoint`.
    pub fn new(factory: F, endpoint: Endpoint) -> Self {
        FeedbackReader { factory, endpoint }
    }

    /// Creates a reader for the feedback endpoint described by `config`.
    pub fn from_config(factory: F, config: &GatewayConfig) -> Self {
        Self::new(
            factory,
            Endpoint::new(config.feedback_host(), config.feedback_port),
        )
    }

    /// Returns the feedback endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Reads every record the service has queued, then closes the session.
    pub fn read_feedback(&self) -> PushResult<Vec<FeedbackRecord>> {
        let mut session = self.factory.open(&self.endpoint)?;
        debug!(endpoint = %self.endpoint, "feedback session opened");

        let records = FeedbackRecords::new(&mut session).collect::<PushResult<Vec<_>>>();

        let _ = session.close();
        if let Ok(records) = &records {
            debug!(endpoint = %self.endpoint, count = records.len(), "feedback read");
        }
        records
    }
}
