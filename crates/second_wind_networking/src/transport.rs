//! # Transport Layer
//!
//! Frame delivery between peers of one session.
//!
//! ## Design
//!
//! - [`Transport`] abstracts the link so the peer logic is testable offline
//! - [`UdpTransport`] is the production link: non-blocking UDP with a peer
//!   address table and packet statistics
//! - [`LoopbackHub`] wires peers together in-process for tests
//!
//! Delivery is best-effort at this layer. The replication design tolerates
//! duplicates and redelivery because event application is idempotent.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::MAX_PACKET_SIZE;

/// Failure constructing a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying socket could not be created or configured.
    #[error("transport socket error: {0}")]
    Socket(#[from] io::Error),
}

/// A session link as seen by one peer.
///
/// Send paths never report per-frame errors; a lost frame is repaired by the
/// next state change touching the same player, or by redelivery from the
/// session host.
pub trait Transport: Send {
    /// Sends a frame toward the relay. Used by leaf peers.
    fn send_upstream(&mut self, data: &[u8]);

    /// Broadcasts a frame to every connected peer except `skip`.
    /// Used by the relay.
    fn broadcast_except(&mut self, data: &[u8], skip: Option<u16>);

    /// Receives the next pending frame and the id of the peer it came from,
    /// or `None` when nothing is waiting.
    fn recv(&mut self) -> Option<(u16, Vec<u8>)>;
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Frames sent.
    pub packets_sent: u64,
    /// Frames received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

/// UDP link between session peers.
///
/// A thin wrapper around std UDP with non-blocking mode, a peer address
/// table, and statistics. A leaf registers only the relay; the relay
/// registers every leaf.
pub struct UdpTransport {
    socket: std::net::UdpSocket,
    local_addr: SocketAddr,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    /// Peer id to address, for sending.
    peers: HashMap<u16, SocketAddr>,
    /// Address to peer id, for attributing received frames.
    peer_ids: HashMap<SocketAddr, u16>,
    /// Relay peer id, for `send_upstream`.
    relay_id: Option<u16>,
    stats: TransportStats,
}

impl UdpTransport {
    /// Creates a transport bound to the specified address.
    ///
    /// # Errors
    ///
    /// [`TransportError::Socket`] when binding or configuring the socket
    /// fails.
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = std::net::UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            peers: HashMap::new(),
            peer_ids: HashMap::new(),
            relay_id: None,
            stats: TransportStats::default(),
        })
    }

    /// Returns the local address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers another peer of this session.
    pub fn register_peer(&mut self, peer_id: u16, addr: SocketAddr) {
        self.peers.insert(peer_id, addr);
        self.peer_ids.insert(addr, peer_id);
    }

    /// Marks one registered peer as the relay.
    pub fn set_relay(&mut self, peer_id: u16) {
        self.relay_id = Some(peer_id);
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    fn send_to(&mut self, data: &[u8], addr: SocketAddr) {
        match self.socket.send_to(data, addr) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
            }
            Err(err) => {
                self.stats.send_errors += 1;
                tracing::warn!(%addr, %err, "frame send failed");
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send_upstream(&mut self, data: &[u8]) {
        let Some(addr) = self.relay_id.and_then(|id| self.peers.get(&id).copied()) else {
            tracing::warn!("no relay registered, dropping outbound frame");
            return;
        };
        self.send_to(data, addr);
    }

    fn broadcast_except(&mut self, data: &[u8], skip: Option<u16>) {
        let targets: Vec<SocketAddr> = self
            .peers
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(_, addr)| *addr)
            .collect();
        for addr in targets {
            self.send_to(data, addr);
        }
    }

    fn recv(&mut self) -> Option<(u16, Vec<u8>)> {
        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((len, addr)) => {
                    self.stats.packets_received += 1;
                    self.stats.bytes_received += len as u64;
                    if let Some(peer_id) = self.peer_ids.get(&addr).copied() {
                        return Some((peer_id, self.recv_buffer[..len].to_vec()));
                    }
                    // Frame from an unregistered address: drop and keep
                    // draining the socket.
                    tracing::debug!(%addr, "dropping frame from unknown peer");
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return None,
                Err(err) => {
                    self.stats.recv_errors += 1;
                    tracing::warn!(%err, "frame receive failed");
                    return None;
                }
            }
        }
    }
}

type Mailboxes = Arc<Mutex<HashMap<u16, crossbeam_channel::Sender<(u16, Vec<u8>)>>>>;

/// In-process hub wiring several [`LoopbackTransport`]s together for tests.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    mailboxes: Mailboxes,
}

impl LoopbackHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new peer to the hub.
    #[must_use]
    pub fn attach(&self, peer_id: u16, relay_id: u16) -> LoopbackTransport {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.mailboxes.lock().insert(peer_id, sender);
        LoopbackTransport {
            peer_id,
            relay_id,
            mailboxes: Arc::clone(&self.mailboxes),
            inbox: receiver,
        }
    }
}

/// Test transport delivering frames through in-process channels.
pub struct LoopbackTransport {
    peer_id: u16,
    relay_id: u16,
    mailboxes: Mailboxes,
    inbox: crossbeam_channel::Receiver<(u16, Vec<u8>)>,
}

impl Transport for LoopbackTransport {
    fn send_upstream(&mut self, data: &[u8]) {
        if let Some(sender) = self.mailboxes.lock().get(&self.relay_id) {
            let _ = sender.send((self.peer_id, data.to_vec()));
        }
    }

    fn broadcast_except(&mut self, data: &[u8], skip: Option<u16>) {
        for (peer_id, sender) in self.mailboxes.lock().iter() {
            if *peer_id == self.peer_id || Some(*peer_id) == skip {
                continue;
            }
            let _ = sender.send((self.peer_id, data.to_vec()));
        }
    }

    fn recv(&mut self) -> Option<(u16, Vec<u8>)> {
        self.inbox.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_upstream_reaches_relay_only() {
        let hub = LoopbackHub::new();
        let mut relay = hub.attach(0, 0);
        let mut leaf_a = hub.attach(1, 0);
        let mut leaf_b = hub.attach(2, 0);

        leaf_a.send_upstream(b"frame");

        assert_eq!(relay.recv(), Some((1, b"frame".to_vec())));
        assert_eq!(relay.recv(), None);
        assert_eq!(leaf_b.recv(), None);
    }

    #[test]
    fn test_loopback_broadcast_skips_origin() {
        let hub = LoopbackHub::new();
        let mut relay = hub.attach(0, 0);
        let mut leaf_a = hub.attach(1, 0);
        let mut leaf_b = hub.attach(2, 0);

        relay.broadcast_except(b"frame", Some(1));

        assert_eq!(leaf_a.recv(), None);
        assert_eq!(leaf_b.recv(), Some((0, b"frame".to_vec())));
        assert_eq!(relay.recv(), None);
    }

    #[test]
    fn test_udp_round_trip() {
        let mut relay = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut leaf = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).unwrap();

        relay.register_peer(1, leaf.local_addr());
        leaf.register_peer(0, relay.local_addr());
        leaf.set_relay(0);

        leaf.send_upstream(b"frame");

        // Non-blocking socket: give the kernel a moment on slow runners.
        let mut received = None;
        for _ in 0..100 {
            if let Some(frame) = relay.recv() {
                received = Some(frame);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(received, Some((1, b"frame".to_vec())));
        assert_eq!(leaf.stats().packets_sent, 1);
    }
}
