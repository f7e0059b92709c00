// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory implementation of [`SessionFactory`] for testing.

use std::collections::{HashSet, VecDeque};
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{PushError, PushResult};
use crate::transport::{Endpoint, GatewaySession, SessionFactory};

#[derive(Debug, Default)]
struct MockState {
    open_attempts: usize,
    handshakes: usize,
    closes: usize,
    endpoints: Vec<Endpoint>,
    frames: Vec<Vec<u8>>,
    write_attempts: usize,
    open_errors: VecDeque<PushError>,
    failing_writes: u32,
    failing_write_attempts: HashSet<usize>,
    failing_flushes: u32,
    read_data: Vec<u8>,
    fail_reads: bool,
}

/// Mock session factory for testing.
///
/// Clones share state, so a test can keep one handle while the manager
/// owns another. Sessions buffer writes the way a TLS stream does: bytes
/// count as delivered only once a flush succeeds.
///
/// # Example
///
/// ```ignore
/// use pushgate_core::{ConnectionManager, MockSessionFactory, Endpoint};
///
/// let factory = MockSessionFactory::new();
/// let manager = ConnectionManager::new(factory.clone(), Endpoint::new("gw", 2195), 3, false);
///
/// factory.fail_next_writes(1);
/// manager.send_notifications(&notifications)?;
///
/// assert_eq!(factory.handshakes(), 2);
/// assert_eq!(factory.frames().len(), notifications.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    state: Arc<Mutex<MockState>>,
}

impl MockSessionFactory {
    /// Creates a new mock factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory whose sessions yield `data` when read.
    pub fn with_read_data(data: impl Into<Vec<u8>>) -> Self {
        let factory = Self::new();
        factory.set_read_data(data);
        factory
    }

    /// Bytes returned by reads on sessions opened after this call.
    pub fn set_read_data(&self, data: impl Into<Vec<u8>>) {
        self.state.lock().read_data = data.into();
    }

    /// Queues an error for the next call to `open`.
    pub fn inject_open_error(&self, error: PushError) {
        self.state.lock().open_errors.push_back(error);
    }

    /// Makes the next `count` opens fail with a connection error.
    pub fn fail_next_opens(&self, count: usize) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state
                .open_errors
                .push_back(PushError::ConnectionFailed("handshake refused".into()));
        }
    }

    /// Makes the next `count` write calls fail with a broken pipe.
    pub fn fail_next_writes(&self, count: u32) {
        self.state.lock().failing_writes = count;
    }

    /// Makes the write attempt with the given zero-based index fail.
    ///
    /// Attempts are counted across all sessions, failed ones included.
    pub fn fail_write_attempt(&self, index: usize) {
        self.state.lock().failing_write_attempts.insert(index);
    }

    /// Makes the next `count` flushes fail with a broken pipe.
    ///
    /// A failed flush discards everything written since the last
    /// successful one, like a TLS stream whose socket has gone away.
    pub fn fail_next_flushes(&self, count: u32) {
        self.state.lock().failing_flushes = count;
    }

    /// Makes every read fail with a connection reset.
    pub fn fail_reads(&self) {
        self.state.lock().fail_reads = true;
    }

    /// Number of calls to `open`, failed ones included.
    pub fn open_attempts(&self) -> usize {
        self.state.lock().open_attempts
    }

    /// Number of sessions successfully opened.
    pub fn handshakes(&self) -> usize {
        self.state.lock().handshakes
    }

    /// Number of sessions closed.
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Sessions opened and not yet closed.
    pub fn live_sessions(&self) -> usize {
        let state = self.state.lock();
        state.handshakes - state.closes
    }

    /// Endpoints passed to successful opens, in order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.state.lock().endpoints.clone()
    }

    /// Every write confirmed by a flush, in wire order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().frames.clone()
    }

    /// Number of write calls, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.state.lock().write_attempts
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    fn open(&self, endpoint: &Endpoint) -> PushResult<MockSession> {
        let mut state = self.state.lock();
        state.open_attempts += 1;
        if let Some(err) = state.open_errors.pop_front() {
            return Err(err);
        }

        state.handshakes += 1;
        state.endpoints.push(endpoint.clone());

        Ok(MockSession {
            state: Arc::clone(&self.state),
            reader: Cursor::new(state.read_data.clone()),
            pending: Vec::new(),
            closed: false,
        })
    }
}

/// Session handed out by [`MockSessionFactory`].
#[derive(Debug)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
    reader: Cursor<Vec<u8>>,
    pending: Vec<Vec<u8>>,
    closed: bool,
}

impl MockSession {
    /// Returns true once the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Read for MockSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "session closed"));
        }
        if self.state.lock().fail_reads {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        self.reader.read(buf)
    }
}

impl Write for MockSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "session closed"));
        }

        let mut state = self.state.lock();
        let attempt = state.write_attempts;
        state.write_attempts += 1;

        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        if state.failing_write_attempts.remove(&attempt) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }

        self.pending.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "session closed"));
        }

        let mut state = self.state.lock();
        if state.failing_flushes > 0 {
            state.failing_flushes -= 1;
            self.pending.clear();
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        state.frames.append(&mut self.pending);
        Ok(())
    }
}

impl GatewaySession for MockSession {
    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.state.lock().closes += 1;
        }
        Ok(())
    }
}
