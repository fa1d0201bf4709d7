//! # Frame Serialization
//!
//! Writes frames into a pre-allocated buffer and decodes them back.
//!
//! ## Design
//!
//! - Pre-allocated buffer, reused across frames (no heap in the pump loop)
//! - Little-endian scalars, direct memory copies for Pod types
//! - Malformed input decodes to `None`, never panics

use bytemuck::{bytes_of, Pod};

use second_wind_core::StateEvent;

use super::packets::{Packet, PacketHeader, PacketType};
use crate::MAX_PACKET_SIZE;

/// Frame serializer - writes frames to a pre-allocated buffer.
///
/// Designed to be reused across multiple serializations to avoid
/// allocations.
pub struct PacketSerializer {
    buffer: [u8; MAX_PACKET_SIZE],
    position: usize,
}

impl PacketSerializer {
    /// Creates a new serializer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_PACKET_SIZE],
            position: 0,
        }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        if self.position >= MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position] = value;
        self.position += 1;
        true
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> bool {
        if self.position + 2 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 2].copy_from_slice(&value.to_le_bytes());
        self.position += 2;
        true
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> bool {
        if self.position + 4 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 4].copy_from_slice(&value.to_le_bytes());
        self.position += 4;
        true
    }

    /// Writes a f64 in little-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) -> bool {
        if self.position + 8 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 8].copy_from_slice(&value.to_le_bytes());
        self.position += 8;
        true
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> bool {
        let bytes = bytes_of(value);
        if self.position + bytes.len() > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }

    /// Writes a length-prefixed UTF-8 string (2-byte length).
    pub fn write_str(&mut self, value: &str) -> bool {
        let bytes = value.as_bytes();
        let Ok(len) = u16::try_from(bytes.len()) else {
            return false;
        };
        if !self.write_u16(len) {
            return false;
        }
        if self.position + bytes.len() > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }

    /// Serializes one state event as a complete frame.
    pub fn serialize_event(&mut self, header: &PacketHeader, event: &StateEvent) -> bool {
        self.reset();
        match event {
            StateEvent::PossessionChanged {
                player_id,
                has_resource,
            } => {
                self.write_u8(PacketType::PossessionChanged as u8)
                    && self.write_pod(header)
                    && self.write_str(player_id)
                    && self.write_u8(u8::from(*has_resource))
            }
            StateEvent::CriticalEntered {
                player_id,
                position,
                time,
            } => {
                self.write_u8(PacketType::CriticalEntered as u8)
                    && self.write_pod(header)
                    && self.write_str(player_id)
                    && self.write_f32(position.0)
                    && self.write_f32(position.1)
                    && self.write_f32(position.2)
                    && self.write_f64(*time)
            }
            StateEvent::CriticalCleared { player_id } => {
                self.write_u8(PacketType::CriticalCleared as u8)
                    && self.write_pod(header)
                    && self.write_str(player_id)
            }
        }
    }
}

impl Default for PacketSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame deserializer - reads frames from a buffer.
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer over a received buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        if self.position >= self.buffer.len() {
            return None;
        }
        let value = self.buffer[self.position];
        self.position += 1;
        Some(value)
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        if self.position + 2 > self.buffer.len() {
            return None;
        }
        let value = u16::from_le_bytes([self.buffer[self.position], self.buffer[self.position + 1]]);
        self.position += 2;
        Some(value)
    }

    /// Reads a f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        if self.position + 4 > self.buffer.len() {
            return None;
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + 4]);
        self.position += 4;
        Some(f32::from_le_bytes(bytes))
    }

    /// Reads a f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> Option<f64> {
        if self.position + 8 > self.buffer.len() {
            return None;
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + 8]);
        self.position += 8;
        Some(f64::from_le_bytes(bytes))
    }

    /// Reads a Pod type directly.
    #[inline]
    pub fn read_pod<T: Pod + Copy>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        if self.position + size > self.buffer.len() {
            return None;
        }
        let slice = &self.buffer[self.position..self.position + size];
        self.position += size;
        bytemuck::try_pod_read_unaligned(slice).ok()
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Option<String> {
        let len = self.read_u16()? as usize;
        if self.position + len > self.buffer.len() {
            return None;
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        std::str::from_utf8(slice).ok().map(str::to_owned)
    }

    /// Decodes one complete frame, or `None` if the buffer is malformed.
    pub fn deserialize(&mut self) -> Option<Packet> {
        let type_byte = self.read_u8()?;
        let header = self.read_pod::<PacketHeader>()?;
        let player_id = self.read_str()?;

        let event = match type_byte {
            x if x == PacketType::PossessionChanged as u8 => {
                let has_resource = self.read_u8()? != 0;
                StateEvent::PossessionChanged {
                    player_id,
                    has_resource,
                }
            }
            x if x == PacketType::CriticalEntered as u8 => {
                let position = (self.read_f32()?, self.read_f32()?, self.read_f32()?);
                let time = self.read_f64()?;
                StateEvent::CriticalEntered {
                    player_id,
                    position,
                    time,
                }
            }
            x if x == PacketType::CriticalCleared as u8 => {
                StateEvent::CriticalCleared { player_id }
            }
            _ => return None,
        };

        Some(Packet { header, event })
    }
}
