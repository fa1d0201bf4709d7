//! # Replication Peer
//!
//! One peer's view of the replication mesh: drains the session's outbound
//! events onto the wire, applies inbound frames to the shared registry, and,
//! on the relay, fans frames out to the other peers.
//!
//! ## Roles
//!
//! - **Relay**: the session host. Applies every frame and re-broadcasts it
//!   to all peers except the originator.
//! - **Leaf**: a client. Sends its own events upstream and applies what the
//!   relay forwards.
//! - **Solo**: offline play. Drains events locally, touches no wire.

use std::collections::HashMap;
use std::sync::Arc;

use second_wind_core::{Registry, StateEvent};

use crate::protocol::{PacketDeserializer, PacketHeader, PacketSerializer};
use crate::transport::Transport;

/// This peer's position in the star topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerRole {
    /// Session host: applies and fans out every frame.
    Relay,
    /// Client: talks to the relay only.
    Leaf,
    /// Offline: no replication at all.
    Solo,
}

/// A replication peer bound to one session registry and one transport.
pub struct ReplicationPeer<T: Transport> {
    role: PeerRole,
    peer_id: u16,
    registry: Arc<Registry>,
    outbound: crossbeam_channel::Receiver<StateEvent>,
    transport: T,
    serializer: PacketSerializer,
    sequence: u16,
    /// Revival marker positions for players currently down, local and
    /// remote alike.
    beacons: HashMap<String, (f32, f32, f32)>,
}

impl<T: Transport> ReplicationPeer<T> {
    /// Creates a peer over the session's registry and outbound event stream.
    #[must_use]
    pub fn new(
        role: PeerRole,
        peer_id: u16,
        registry: Arc<Registry>,
        outbound: crossbeam_channel::Receiver<StateEvent>,
        transport: T,
    ) -> Self {
        Self {
            role,
            peer_id,
            registry,
            outbound,
            transport,
            serializer: PacketSerializer::new(),
            sequence: 0,
            beacons: HashMap::new(),
        }
    }

    /// This peer's role.
    #[must_use]
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Revival marker position for a downed player, if one is known.
    #[must_use]
    pub fn beacon(&self, player_id: &str) -> Option<(f32, f32, f32)> {
        self.beacons.get(player_id).copied()
    }

    /// Drains the session's outbound events onto the wire.
    ///
    /// Call once per frame. A solo peer still drains so the channel never
    /// backs up.
    pub fn pump_outbound(&mut self) {
        while let Ok(event) = self.outbound.try_recv() {
            self.track_beacon(&event);

            if self.role == PeerRole::Solo {
                continue;
            }

            let header = PacketHeader::new(self.sequence, self.peer_id);
            self.sequence = self.sequence.wrapping_add(1);
            if !self.serializer.serialize_event(&header, &event) {
                tracing::warn!(player = event.player_id(), "outbound frame too large, dropped");
                continue;
            }

            match self.role {
                PeerRole::Leaf => self.transport.send_upstream(self.serializer.as_slice()),
                PeerRole::Relay => self.transport.broadcast_except(self.serializer.as_slice(), None),
                PeerRole::Solo => {}
            }
        }
    }

    /// Applies every pending inbound frame.
    ///
    /// On the relay, each frame is also re-broadcast to the other peers,
    /// skipping the originator so it never sees its own echo. Malformed
    /// frames are logged and dropped.
    pub fn poll(&mut self) {
        while let Some((from, bytes)) = self.transport.recv() {
            let Some(packet) = PacketDeserializer::new(&bytes).deserialize() else {
                tracing::warn!(from, len = bytes.len(), "dropping malformed frame");
                continue;
            };

            self.apply(&packet.event);

            if self.role == PeerRole::Relay {
                self.transport
                    .broadcast_except(&bytes, Some(packet.header.origin));
            }
        }
    }

    /// Applies one remote state change to the local registry.
    ///
    /// Plain assignment only, so redelivered frames are harmless. A remote
    /// clear never grants invulnerability; protection windows are a local
    /// concern of the peer that performed the revival.
    pub fn apply(&mut self, event: &StateEvent) {
        match event {
            StateEvent::PossessionChanged {
                player_id,
                has_resource,
            } => {
                self.registry.set(player_id, |state| {
                    state.has_resource = *has_resource;
                });
            }
            StateEvent::CriticalEntered {
                player_id,
                position,
                time,
            } => {
                let mut entered = false;
                self.registry.set(player_id, |state| {
                    if state.invulnerable {
                        return;
                    }
                    state.critical = true;
                    state.last_critical_entered_at = state.last_critical_entered_at.max(*time);
                    entered = true;
                });
                // A defensively ignored entry must not leave a marker either.
                if entered {
                    self.beacons.insert(player_id.clone(), *position);
                }
            }
            StateEvent::CriticalCleared { player_id } => {
                self.registry.set(player_id, |state| {
                    state.critical = false;
                });
                self.beacons.remove(player_id);
            }
        }
    }

    fn track_beacon(&mut self, event: &StateEvent) {
        match event {
            StateEvent::CriticalEntered {
                player_id,
                position,
                ..
            } => {
                self.beacons.insert(player_id.clone(), *position);
            }
            StateEvent::CriticalCleared { player_id } => {
                self.beacons.remove(player_id);
            }
            StateEvent::PossessionChanged { .. } => {}
        }
    }
}
