//! # SECOND WIND Networking - Critical State Replication
//!
//! Replicates possession and critical state between session peers so every
//! client renders downed teammates, suppresses AI, and places revival markers
//! consistently.
//!
//! ## Topology
//!
//! ```text
//! LEAF                             RELAY                         LEAF
//!   |                                |                             |
//!   |--- CriticalEntered(p1) ------->|                             |
//!   |                                | apply locally               |
//!   |                                |--- re-broadcast ----------->|
//!   |                                |    (skips the originator)   |
//! ```
//!
//! The relay is a dumb fan-out, not an authority: every peer applies events
//! to its own registry and the system is eventually consistent. Application
//! is idempotent plain assignment, so duplicate delivery is harmless and no
//! acknowledgment protocol is needed on top of the session transport.
//!
//! ## Example
//!
//! ```rust,ignore
//! use second_wind_networking::{PeerRole, ReplicationPeer, UdpTransport};
//!
//! let transport = UdpTransport::bind("0.0.0.0:7777".parse()?)?;
//! let mut peer = ReplicationPeer::new(PeerRole::Leaf, 1, session.registry(),
//!     session.event_receiver(), transport);
//! // once per frame:
//! peer.pump_outbound();
//! peer.poll();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod peer;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use peer::{PeerRole, ReplicationPeer};
pub use protocol::{Packet, PacketDeserializer, PacketHeader, PacketSerializer, PacketType};
pub use transport::{LoopbackHub, LoopbackTransport, Transport, TransportError, UdpTransport};

/// Maximum frame size in bytes. State frames are tiny; this stays far below
/// any path MTU so frames never fragment.
pub const MAX_PACKET_SIZE: usize = 512;
