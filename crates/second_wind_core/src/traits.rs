//! # Collaborator Seams
//!
//! Traits the host engine implements to integrate with the revival core.
//!
//! ## Architecture
//!
//! This crate NEVER reaches into the host's inventory, health simulation, or
//! AI internals. It defines the seams here; the host implements them.
//!
//! ```text
//! Core defines:            Host implements:
//! ┌──────────────────┐     ┌──────────────────┐
//! │ ResourceOracle   │ ←── │ inventory store  │
//! │ VitalsEngine     │ ←── │ health sim       │
//! │ PerceptionControl│ ←── │ AI senses        │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! The original reflection-based inventory poking is gone: consumption is a
//! normal typed method on [`ResourceOracle`].

use crate::error::ConsumeError;
use crate::policy::BodyRegion;

/// Marker for a completed resource consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumed;

/// Interface to the host's inventory store.
///
/// Consumption is best-effort: it is NOT transactional with the state
/// transition that triggered it, and a failure never aborts a revival.
pub trait ResourceOracle: Send {
    /// Returns true if the player currently holds the revival resource.
    fn has_revival_resource(&self, player_id: &str) -> bool;

    /// Removes one revival resource from the player's inventory.
    ///
    /// # Errors
    ///
    /// [`ConsumeError::NotFound`] when the player no longer holds the
    /// resource, [`ConsumeError::Failed`] when the store rejects the
    /// operation.
    fn consume_revival_resource(&mut self, player_id: &str) -> Result<Consumed, ConsumeError>;
}

/// Interface to the host's health simulation.
///
/// Used for fatality estimation before a hit lands and for the generous heal
/// a revival applies.
pub trait VitalsEngine: Send {
    /// Current health of one body region, or `None` when the query fails.
    /// Callers fall back to conservative constants on `None`.
    fn current_health(&self, player_id: &str, region: BodyRegion) -> Option<f32>;

    /// Adjusts one body region's health by `delta` (positive heals).
    fn change_health(&mut self, player_id: &str, region: BodyRegion, delta: f32);

    /// Restores non-regional vitals (the energy/hydration analog) after a
    /// revival.
    fn restore_vitals(&mut self, player_id: &str);
}

/// Interface to the host's AI-perception layer and world positions.
///
/// The stealth side effect saves a player's detection sensitivity, zeroes it
/// while they are down, and restores it when protection ends.
pub trait PerceptionControl: Send {
    /// The player's current detection-sensitivity value.
    fn awareness(&self, player_id: &str) -> f32;

    /// Overwrites the player's detection-sensitivity value.
    fn set_awareness(&mut self, player_id: &str, value: f32);

    /// World position of the player, or `None` if unknown to this peer.
    fn position_of(&self, player_id: &str) -> Option<(f32, f32, f32)>;
}

// ============================================================================
// MOCK IMPLEMENTATIONS (For Testing)
// ============================================================================

/// Mock inventory for tests: a set of ids that hold the resource, with an
/// optional forced failure mode.
pub struct MockOracle {
    holders: std::collections::HashSet<String>,
    /// When set, every consume attempt fails with this error.
    pub fail_consume: Option<ConsumeError>,
    /// Number of successful consumptions.
    pub consumed: usize,
}

impl MockOracle {
    /// Creates a mock where nobody holds the resource.
    #[must_use]
    pub fn new() -> Self {
        Self {
            holders: std::collections::HashSet::new(),
            fail_consume: None,
            consumed: 0,
        }
    }

    /// Grants the resource to a player.
    pub fn grant(&mut self, player_id: &str) {
        self.holders.insert(player_id.to_owned());
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceOracle for MockOracle {
    fn has_revival_resource(&self, player_id: &str) -> bool {
        self.holders.contains(player_id)
    }

    fn consume_revival_resource(&mut self, player_id: &str) -> Result<Consumed, ConsumeError> {
        if let Some(err) = &self.fail_consume {
            return Err(err.clone());
        }
        if self.holders.remove(player_id) {
            self.consumed += 1;
            Ok(Consumed)
        } else {
            Err(ConsumeError::NotFound)
        }
    }
}

/// Mock health simulation: per-region pools defaulting to 80 health.
pub struct MockVitals {
    health: std::collections::HashMap<(String, BodyRegion), f32>,
    /// When true, every health query fails (returns `None`).
    pub queries_fail: bool,
    /// Number of `restore_vitals` calls.
    pub vitals_restored: usize,
}

impl MockVitals {
    /// Creates a mock where every region starts at 80 health.
    #[must_use]
    pub fn new() -> Self {
        Self {
            health: std::collections::HashMap::new(),
            queries_fail: false,
            vitals_restored: 0,
        }
    }

    /// Sets one region's health directly.
    pub fn set_health(&mut self, player_id: &str, region: BodyRegion, value: f32) {
        self.health.insert((player_id.to_owned(), region), value);
    }
}

impl Default for MockVitals {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalsEngine for MockVitals {
    fn current_health(&self, player_id: &str, region: BodyRegion) -> Option<f32> {
        if self.queries_fail {
            return None;
        }
        Some(
            self.health
                .get(&(player_id.to_owned(), region))
                .copied()
                .unwrap_or(80.0),
        )
    }

    fn change_health(&mut self, player_id: &str, region: BodyRegion, delta: f32) {
        let current = self
            .health
            .get(&(player_id.to_owned(), region))
            .copied()
            .unwrap_or(80.0);
        self.health
            .insert((player_id.to_owned(), region), (current + delta).max(0.0));
    }

    fn restore_vitals(&mut self, player_id: &str) {
        let _ = player_id;
        self.vitals_restored += 1;
    }
}

/// Mock perception layer: awareness values and fixed positions.
pub struct MockSenses {
    awareness: std::collections::HashMap<String, f32>,
    positions: std::collections::HashMap<String, (f32, f32, f32)>,
}

impl MockSenses {
    /// Creates a mock where every player has awareness 1.0 and no position.
    #[must_use]
    pub fn new() -> Self {
        Self {
            awareness: std::collections::HashMap::new(),
            positions: std::collections::HashMap::new(),
        }
    }

    /// Places a player in the mock world.
    pub fn place(&mut self, player_id: &str, position: (f32, f32, f32)) {
        self.positions.insert(player_id.to_owned(), position);
    }
}

impl Default for MockSenses {
    fn default() -> Self {
        Self::new()
    }
}

impl PerceptionControl for MockSenses {
    fn awareness(&self, player_id: &str) -> f32 {
        self.awareness.get(player_id).copied().unwrap_or(1.0)
    }

    fn set_awareness(&mut self, player_id: &str, value: f32) {
        self.awareness.insert(player_id.to_owned(), value);
    }

    fn position_of(&self, player_id: &str) -> Option<(f32, f32, f32)> {
        self.positions.get(player_id).copied()
    }
}
