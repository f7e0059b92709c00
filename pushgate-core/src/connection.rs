// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager
//!
//! Owns the single shared gateway session and serializes all sends through
//! one lock, reconnecting and retrying on transient failures.

use std::io::Write;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::GatewayConfig;
use crate::error::{PushError, PushResult};
use crate::notification::{Notification, MAX_FRAME_SIZE};
use crate::transport::{ConnectionState, Endpoint, GatewaySession, SessionFactory};

/// Everything the lock protects: the live session and the persistence flag.
struct ConnectionSlot<S: GatewaySession> {
    session: Option<S>,
    persistent: bool,
}

impl<S: GatewaySession> ConnectionSlot<S> {
    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.close(); // Best effort; the session is dropped either way
        }
    }
}

/// Connection manager for the notification gateway.
///
/// Wraps a session factory and adds:
/// - Lazy connection on first send
/// - Bounded reconnect-and-retry on transient failures
/// - Close-after-batch unless persistence mode is on
///
/// One batch at a time holds the lock, from connection setup through the
/// last write and all retries in between. Share it across threads with an
/// `Arc`.
///
/// # Example
///
/// ```ignore
/// use pushgate_core::{ConnectionManager, Endpoint, TlsSessionFactory};
///
/// let manager = ConnectionManager::new(factory, Endpoint::new(host, 2195), 3, false);
/// manager.start_persistence();
/// manager.send_notifications(&batch)?;
/// manager.stop_persistence();
/// ```
pub struct ConnectionManager<F: SessionFactory> {
    factory: F,
    endpoint: Endpoint,
    retry_limit: u32,
    slot: Mutex<ConnectionSlot<F::Session>>,
}

impl<F: SessionFactory> ConnectionManager<F> {
    /// Creates a new connection manager.
    ///
    /// `retry_limit` is the total number of attempts per batch; 0 is
    /// treated as 1.
    pub fn new(factory: F, endpoint: Endpoint, retry_limit: u32, persistent: bool) -> Self {
        ConnectionManager {
            factory,
            endpoint,
            retry_limit: retry_limit.max(1),
            slot: Mutex::new(ConnectionSlot {
                session: None,
                persistent,
            }),
        }
    }

    /// Creates a manager for the gateway endpoint described by `config`.
    pub fn from_config(factory: F, config: &GatewayConfig) -> Self {
        Self::new(
            factory,
            Endpoint::new(config.host.clone(), config.port),
            config.retry_limit,
            config.persistent,
        )
    }

    /// Returns the gateway endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the total number of attempts per batch.
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Returns the session factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        let slot = self.slot.lock();
        match (slot.session.is_some(), slot.persistent) {
            (false, _) => ConnectionState::Closed,
            (true, false) => ConnectionState::Open,
            (true, true) => ConnectionState::PersistentOpen,
        }
    }

    /// Returns true if persistence mode is on.
    pub fn is_persistent(&self) -> bool {
        self.slot.lock().persistent
    }

    /// Keeps the session open between batches.
    pub fn start_persistence(&self) {
        self.slot.lock().persistent = true;
        debug!(endpoint = %self.endpoint, "persistence started");
    }

    /// Turns persistence off and closes the live session, if any.
    ///
    /// Waits for an in-flight batch to finish first.
    pub fn stop_persistence(&self) {
        let mut slot = self.slot.lock();
        slot.persistent = false;
        if slot.session.is_some() {
            slot.close();
            debug!(endpoint = %self.endpoint, "persistence stopped, session closed");
        }
    }

    /// Sends one notification.
    pub fn send_notification(&self, notification: &Notification) -> PushResult<()> {
        self.send_notifications(std::slice::from_ref(notification))
    }

    /// Sends a batch of notifications over the shared session.
    ///
    /// Frames are written and flushed one at a time, in order. A transient
    /// failure closes the session, reconnects and resumes at the first frame
    /// whose flush did not succeed; confirmed frames are not sent again. After `retry_limit` failed attempts the
    /// last error is returned wrapped in [`PushError::DeliveryFailed`] and
    /// the session is left closed.
    ///
    /// An empty batch still opens a session, then applies the persistence
    /// policy like any other batch.
    pub fn send_notifications(&self, notifications: &[Notification]) -> PushResult<()> {
        let frames: Vec<Vec<u8>> = notifications
            .iter()
            .map(|notification| {
                if notification.exceeds_gateway_limit() {
                    warn!(
                        frame_len = notification.frame_len(),
                        max = MAX_FRAME_SIZE,
                        "frame exceeds gateway limit, sending anyway"
                    );
                }
                notification.encode()
            })
            .collect();

        let mut slot = self.slot.lock();
        self.deliver(&mut slot, &frames)?;

        if !slot.persistent {
            slot.close();
            debug!(endpoint = %self.endpoint, "session closed after batch");
        }
        Ok(())
    }

    fn deliver(
        &self,
        slot: &mut ConnectionSlot<F::Session>,
        frames: &[Vec<u8>],
    ) -> PushResult<()> {
        let mut attempt = 1;
        let mut next = 0;

        loop {
            match self.write_frames(slot, frames, &mut next) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() => {
                    slot.close();
                    if attempt >= self.retry_limit {
                        return Err(PushError::DeliveryFailed {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    debug!(
                        endpoint = %self.endpoint,
                        attempt,
                        frame = next,
                        error = %err,
                        "delivery attempt failed, reconnecting"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    slot.close();
                    return Err(err);
                }
            }
        }
    }

    fn write_frames(
        &self,
        slot: &mut ConnectionSlot<F::Session>,
        frames: &[Vec<u8>],
        next: &mut usize,
    ) -> PushResult<()> {
        let session = self.ensure_open(slot)?;

        // TLS streams buffer writes and may only report a dead socket on
        // flush, so a frame counts as sent once its flush succeeds.
        while let Some(frame) = frames.get(*next) {
            session
                .write_all(frame)
                .map_err(|e| PushError::WriteFailed(e.to_string()))?;
            session
                .flush()
                .map_err(|e| PushError::WriteFailed(format!("flush failed: {}", e)))?;
            trace!(frame = *next, len = frame.len(), "frame written");
            *next += 1;
        }
        Ok(())
    }

    fn ensure_open<'a>(
        &self,
        slot: &'a mut ConnectionSlot<F::Session>,
    ) -> PushResult<&'a mut F::Session> {
        let session = match slot.session.take() {
            Some(session) => session,
            None => {
                let session = self.factory.open(&self.endpoint)?;
                debug!(endpoint = %self.endpoint, "gateway session opened");
                session
            }
        };
        Ok(slot.session.insert(session))
    }
}

impl<F: SessionFactory> Drop for ConnectionManager<F> {
    fn drop(&mut self) {
        self.slot.get_mut().close();
    }
}
