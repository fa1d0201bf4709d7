//! # Replication Protocol
//!
//! Compact binary frames for the three replicated state changes.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Type (1 byte)                                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Header (4 bytes): Sequence (2) │ Origin peer (2)             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Player id (2-byte length + UTF-8 bytes)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Variant payload (0-20 bytes)                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All scalars are little-endian. Timestamps travel as 8-byte floats so
//! session clocks survive long matches without precision loss.

mod packets;
mod serialization;

pub use packets::{Packet, PacketHeader, PacketType};
pub use serialization::{PacketDeserializer, PacketSerializer};
