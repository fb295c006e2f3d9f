//! Scripted in-memory connection for unit tests.
//!
//! A [`MockConnection`] replays chunks fed through its [`MockHandle`] as
//! receive completions, records everything sent, and counts receive
//! attempts so single-flight behavior can be asserted. Dropping the
//! handle ends the stream (`recv` yields `Ok(0)`).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use super::Connection;
use crate::core::error::TransportError;

pub(crate) struct MockConnection {
    incoming: Mutex<mpsc::UnboundedReceiver<io::Result<Vec<u8>>>>,
    sent: StdMutex<Vec<u8>>,
    closed: AtomicBool,
    shutdown_called: AtomicBool,
    recv_calls: AtomicUsize,
    fail_sends: AtomicBool,
}

pub(crate) struct MockHandle {
    tx: mpsc::UnboundedSender<io::Result<Vec<u8>>>,
}

impl MockConnection {
    pub(crate) fn pair() -> (Arc<Self>, MockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            incoming: Mutex::new(rx),
            sent: StdMutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            shutdown_called: AtomicBool::new(false),
            recv_calls: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
        });
        (conn, MockHandle { tx })
    }

    /// All bytes written to this connection so far.
    pub(crate) fn sent_bytes(&self) -> Vec<u8> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of receive attempts started.
    pub(crate) fn recv_calls(&self) -> usize {
        self.recv_calls.load(Ordering::Acquire)
    }

    pub(crate) fn was_shutdown(&self) -> bool {
        self.shutdown_called.load(Ordering::Acquire)
    }

    /// Make every subsequent `send` fail with an I/O error.
    pub(crate) fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::Release);
    }
}

impl MockHandle {
    /// Queue bytes to be returned by the next receive.
    pub(crate) fn feed(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(bytes.to_vec()));
    }

    /// Queue an I/O error for the next receive.
    pub(crate) fn feed_error(&self) {
        let _ = self
            .tx
            .send(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn is_connected(&self) -> bool {
        !self.is_closed()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, data: &[u8]) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        self.sent.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.recv_calls.fetch_add(1, Ordering::AcqRel);
        let mut incoming = self.incoming.lock().await;
        match incoming.recv().await {
            None => Ok(0),
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(TransportError::Io(e)),
        }
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.shutdown_called.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
