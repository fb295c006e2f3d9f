//! # FERRY Protocol
//!
//! **F**ramed **E**xchange and **R**elay over **bY**te streams
//!
//! FERRY is a minimal length-prefixed framing protocol for reliable byte
//! streams, plus a forwarding proxy that relays decoded frames to an
//! upstream peer. It provides:
//!
//! - **Framing**: a fixed 12-byte header + opaque body, with streaming
//!   decode that survives partial and coalesced frames
//! - **Handshake**: a pure HELLO / HELLO_ACK state machine with explicit,
//!   declarative effects
//! - **Sessions**: one connection bound to one state machine, with a
//!   single-flight receive guard and at-most-once in-order delivery
//! - **Relay**: a proxy forwarder pumping frames between two independent
//!   framed connections
//!
//! ## Feature Flags
//!
//! - `transport` (default): connection abstraction, TCP transport,
//!   session, and proxy
//! - `client` (default): active-opener driver
//! - `server` (default): passive-opener driver
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included)
//! - [`packet`]: packet model and wire codec (always included)
//! - [`protocol`]: handshake state machine (always included)
//! - [`transport`]: byte-stream connections (requires `transport`)
//! - [`session`]: session component (requires `transport`)
//! - [`proxy`]: proxy forwarder (requires `transport`)
//! - [`client`] / [`server`]: polling drivers (requires `client`/`server`)
//!
//! ## Example Usage
//!
//! ```rust
//! use ferry_protocol::packet::{codec, Accumulator, Packet};
//! use ferry_protocol::protocol::{Effect, ProtocolFsm, ProtocolState};
//!
//! // Frame some application data.
//! let wire = codec::encode(&Packet::data(bytes::Bytes::from_static(b"Hello-1")));
//!
//! // Decode a byte stream, partial frames and all.
//! let mut acc = Accumulator::new();
//! acc.extend(&wire[..5]);
//! assert!(acc.decode_frames().unwrap().is_empty());
//! acc.extend(&wire[5..]);
//! assert_eq!(acc.decode_frames().unwrap().len(), 1);
//!
//! // Drive the handshake.
//! let mut fsm = ProtocolFsm::new();
//! assert_eq!(fsm.on_session_start(), Effect::Send(vec![Packet::hello()]));
//! fsm.handle_packet(&Packet::hello_ack());
//! assert_eq!(fsm.state(), ProtocolState::Ready);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Packet model and codec (always included)
pub mod packet;

// Handshake state machine (always included)
pub mod protocol;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Session component (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod session;

// Proxy forwarder (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod proxy;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use crate::core::constants::*;
    pub use crate::core::{CodecError, FerryError, SessionError, TransportError};

    // Packet model and codec
    pub use crate::packet::{Accumulator, Packet, PacketHeader, PacketType, decode, encode};

    // State machine
    pub use crate::protocol::{EarlyDataPolicy, Effect, ProtocolFsm, ProtocolState};

    // Transport + session types (when enabled)
    #[cfg(feature = "transport")]
    pub use crate::proxy::{ForwardingListener, ProxyConfig, ProxyForwarder};
    #[cfg(feature = "transport")]
    pub use crate::session::{
        CloseReason, ReadyGate, Session, SessionConfig, SessionListener, SessionState, StepResult,
    };
    #[cfg(feature = "transport")]
    pub use crate::transport::{Connection, TcpConnection, TcpServer};

    #[cfg(feature = "client")]
    pub use crate::client::ClientSession;
    #[cfg(feature = "server")]
    pub use crate::server::ServerSession;
}

// Re-export commonly used items at crate root
pub use crate::core::{CodecError, FerryError, SessionError, TransportError};
pub use crate::packet::{Packet, PacketHeader, PacketType};
pub use crate::protocol::{EarlyDataPolicy, Effect, ProtocolFsm, ProtocolState};

#[cfg(feature = "transport")]
pub use crate::session::{CloseReason, Session, SessionListener, SessionState};
