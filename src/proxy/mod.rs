//! Proxy forwarder: bridges two independent framed connections.
//!
//! DATA packets observed on the downstream session are re-encoded and
//! written to the upstream connection; a background pump drains the
//! upstream connection's byte stream, decodes it with the same
//! accumulation discipline the session uses, and writes each decoded
//! frame back to the downstream connection in arrival order.
//!
//! Each direction owns its accumulation state; the two directions share
//! nothing but the connection handles. There is no reconnection logic:
//! any failure terminates the pump.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::constants::{ACC_INITIAL_CAPACITY, PUMP_READ_BUFFER_SIZE};
use crate::core::error::TransportError;
use crate::packet::codec::{self, Accumulator};
use crate::packet::{Packet, PacketType};
use crate::session::{CloseReason, SessionListener};
use crate::transport::Connection;

/// Tunables for the reverse pump.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Size of the pump's per-iteration read buffer.
    pub read_buffer_size: usize,
    /// Initial capacity of the pump's accumulation buffer.
    pub acc_capacity: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: PUMP_READ_BUFFER_SIZE,
            acc_capacity: ACC_INITIAL_CAPACITY,
        }
    }
}

/// Relays frames between a downstream peer and an upstream peer.
pub struct ProxyForwarder {
    upstream: Arc<dyn Connection>,
    downstream: Arc<dyn Connection>,
    pump_started: AtomicBool,
    config: ProxyConfig,
}

impl ProxyForwarder {
    /// Pair an upstream connection with the downstream peer connection.
    pub fn new(upstream: Arc<dyn Connection>, downstream: Arc<dyn Connection>) -> Self {
        Self::with_config(upstream, downstream, ProxyConfig::default())
    }

    /// Like [`new`](Self::new), with explicit tunables.
    pub fn with_config(
        upstream: Arc<dyn Connection>,
        downstream: Arc<dyn Connection>,
        config: ProxyConfig,
    ) -> Self {
        Self {
            upstream,
            downstream,
            pump_started: AtomicBool::new(false),
            config,
        }
    }

    /// Re-encode one packet and write it to the upstream connection.
    ///
    /// The first call also starts the reverse pump; later calls find it
    /// already running.
    pub async fn forward_to_upstream(&self, packet: &Packet) -> Result<(), TransportError> {
        self.start_pump_if_needed();
        self.upstream.send(&codec::encode(packet)).await?;
        Ok(())
    }

    /// Whether the reverse pump has been started.
    pub fn pump_started(&self) -> bool {
        self.pump_started.load(Ordering::Acquire)
    }

    fn start_pump_if_needed(&self) {
        if self.pump_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let upstream = Arc::clone(&self.upstream);
        let downstream = Arc::clone(&self.downstream);
        let config = self.config.clone();
        tokio::spawn(pump(upstream, downstream, config));
    }
}

/// Reverse pump: upstream byte stream -> decoded frames -> downstream.
///
/// One iteration is one blocking receive. Exits (never retries) when
/// either connection is closed, the upstream stream ends, a frame fails
/// to decode, or any write fails.
async fn pump(
    upstream: Arc<dyn Connection>,
    downstream: Arc<dyn Connection>,
    config: ProxyConfig,
) {
    let mut read_buf = vec![0u8; config.read_buffer_size];
    let mut acc = Accumulator::with_capacity(config.acc_capacity);

    loop {
        if downstream.is_closed() || upstream.is_closed() {
            debug!("pump exiting: connection closed");
            return;
        }

        let n = match upstream.recv(&mut read_buf).await {
            Ok(0) => {
                debug!("pump exiting: upstream stream ended");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "pump exiting: upstream receive failed");
                return;
            }
        };

        acc.extend(&read_buf[..n]);
        let packets = match acc.decode_frames() {
            Ok(packets) => packets,
            Err(e) => {
                warn!(error = %e, "pump exiting: upstream framing error");
                return;
            }
        };

        for packet in &packets {
            if let Err(e) = downstream.send(&codec::encode(packet)).await {
                warn!(error = %e, "pump exiting: downstream write failed");
                return;
            }
        }
    }
}

/// Session listener that relays observed DATA packets to an upstream peer.
pub struct ForwardingListener {
    forwarder: Arc<ProxyForwarder>,
}

impl ForwardingListener {
    /// Wrap a forwarder as a session listener.
    pub fn new(forwarder: Arc<ProxyForwarder>) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl SessionListener for ForwardingListener {
    async fn on_packets(&self, packets: &[Packet]) {
        for packet in packets {
            if packet.packet_type() != PacketType::Data {
                continue;
            }
            if let Err(e) = self.forwarder.forward_to_upstream(packet).await {
                warn!(error = %e, "upstream forward failed");
            }
        }
    }

    async fn on_closed(&self, reason: CloseReason) {
        debug!(?reason, "downstream session closed");
    }
}
