//! # State-Change Events
//!
//! Events that flow from this peer's state machine to the replication layer.
//!
//! ## Event Flow for a Critical Entry:
//! ```text
//! 1. Host engine: before_apply_damage(id, 50.0, Chest, Ballistic)
//! 2. Policy: lethal + resource present -> enter critical
//! 3. Policy -> EventChannel: CriticalEntered { id, position, time }
//! 4. Replication peer drains the channel, encodes, sends to relay
//! 5. Relay re-broadcasts; every peer applies the event to its registry
//! ```

/// A replicated state change about a single player.
///
/// Application of every variant must be idempotent - plain field assignment
/// into the registry, no counters - because the transport contract is
/// at-least-once.
#[derive(Clone, Debug, PartialEq)]
pub enum StateEvent {
    /// The player gained or lost the revival-enabling resource.
    PossessionChanged {
        /// Stable player id.
        player_id: String,
        /// Last known possession.
        has_resource: bool,
    },

    /// The player entered the recoverable critical state.
    ///
    /// Carries where and when, so remote peers can place a revival marker
    /// and honor the dedup window.
    CriticalEntered {
        /// Stable player id.
        player_id: String,
        /// World position at the moment of entry.
        position: (f32, f32, f32),
        /// Session-seconds timestamp of the entry.
        time: f64,
    },

    /// The player left the critical state (revived or otherwise).
    CriticalCleared {
        /// Stable player id.
        player_id: String,
    },
}

impl StateEvent {
    /// Returns the id of the player this event is about.
    #[must_use]
    pub fn player_id(&self) -> &str {
        match self {
            Self::PossessionChanged { player_id, .. }
            | Self::CriticalEntered { player_id, .. }
            | Self::CriticalCleared { player_id } => player_id,
        }
    }
}

/// Channel for handing events between the state machine and the replication
/// layer. Uses crossbeam for lock-free communication.
pub struct EventChannel<T> {
    sender: crossbeam_channel::Sender<T>,
    receiver: crossbeam_channel::Receiver<T>,
}

impl<T> EventChannel<T> {
    /// Creates a new bounded event channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a new unbounded event channel.
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Queues an event without blocking.
    ///
    /// Replication is best-effort: if the channel is full or disconnected the
    /// event is dropped and logged, never propagated as a failure into the
    /// state transition that produced it.
    pub fn emit(&self, event: T) {
        if let Err(err) = self.sender.try_send(event) {
            tracing::warn!("dropping outbound state event: {err}");
        }
    }

    /// Tries to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Gets a clone of the sender for another context.
    #[must_use]
    pub fn sender(&self) -> crossbeam_channel::Sender<T> {
        self.sender.clone()
    }

    /// Gets a clone of the receiver for another context.
    #[must_use]
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.receiver.clone()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new(1024)
    }
}
