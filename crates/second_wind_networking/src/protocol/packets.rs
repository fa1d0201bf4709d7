//! # Frame Definitions
//!
//! The wire-level building blocks: the frame type tag, the Pod header
//! prepended to every frame, and the decoded frame.

use bytemuck::{Pod, Zeroable};
use second_wind_core::StateEvent;

/// Frame header - present in every frame.
///
/// Total size: 4 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PacketHeader {
    /// Per-origin sequence number, wrapping.
    pub sequence: u16,
    /// Id of the peer that originated the frame. The relay skips this peer
    /// when re-broadcasting so the originator never sees its own echo.
    pub origin: u16,
}

impl PacketHeader {
    /// Creates a new frame header.
    #[inline]
    #[must_use]
    pub const fn new(sequence: u16, origin: u16) -> Self {
        Self { sequence, origin }
    }

    /// Size of the header in bytes.
    pub const SIZE: usize = 4;
}

/// Types of frames in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// A player gained or lost the revival resource.
    PossessionChanged = 0,
    /// A player entered the critical state.
    CriticalEntered = 1,
    /// A player left the critical state.
    CriticalCleared = 2,
}

/// A decoded frame: the transport header plus the replicated event.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    /// Transport header.
    pub header: PacketHeader,
    /// The replicated state change.
    pub event: StateEvent,
}
