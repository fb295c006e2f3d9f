//! Demo upstream: framed sink that stores DATA bodies and acknowledges
//! each one with `OK:<body>`.

use std::net::SocketAddr;

use bytes::BytesMut;
use tracing::{info, warn};

use ferry_protocol::core::constants::{MAX_BODY_SIZE, PUMP_READ_BUFFER_SIZE};
use ferry_protocol::packet::{Accumulator, Packet, PacketType, codec};
use ferry_protocol::transport::{Connection, TcpServer};
use ferry_protocol::FerryError;

pub async fn run(listen_addr: SocketAddr) -> Result<(), FerryError> {
    let server = TcpServer::bind(listen_addr).await?;
    info!(%listen_addr, "upstream listening");

    let conn = server.accept().await?;
    info!(peer = ?conn.remote_addr(), "accepted");

    let mut read_buf = vec![0u8; PUMP_READ_BUFFER_SIZE];
    let mut acc = Accumulator::new();
    let mut received: Vec<String> = Vec::new();

    loop {
        let n = match conn.recv(&mut read_buf).await {
            Ok(0) => {
                info!(messages = received.len(), "stream ended");
                return Ok(());
            }
            Ok(n) => n,
            Err(e) => return Err(e.into()),
        };

        acc.extend(&read_buf[..n]);
        let packets = match acc.decode_frames() {
            Ok(packets) => packets,
            Err(e) => {
                warn!(error = %e, "framing error, giving up on stream");
                return Err(e.into());
            }
        };

        for packet in packets {
            // Only DATA is meaningful here; the proxy strips nothing.
            if packet.packet_type() != PacketType::Data {
                continue;
            }
            // The codec does not bound body sizes; the receiver does.
            if packet.header().length as usize > MAX_BODY_SIZE {
                warn!(length = packet.header().length, "dropping oversized DATA");
                continue;
            }

            let body = String::from_utf8_lossy(packet.body_slice()).into_owned();
            info!(%body, "stored");
            received.push(body);

            let mut ack = BytesMut::from(&b"OK:"[..]);
            ack.extend_from_slice(packet.body_slice());
            conn.send(&codec::encode(&Packet::data(ack.freeze()))).await?;
        }
    }
}
