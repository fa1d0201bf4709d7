//! # Player State Registry
//!
//! The authoritative-per-peer table of player states.
//!
//! ## Design
//!
//! - One `PlayerState` per stable player id, created lazily on the first
//!   mutation (damage event, manual input, or inbound replication event);
//!   reads of an unknown id see the default state WITHOUT inserting, so
//!   query-only consumers like the suppression gate never grow the map
//! - ALL mutation from every component goes through [`Registry::set`], a
//!   single mutex-guarded read-modify-write
//! - Entries are discarded only at session teardown, never mid-session

use std::collections::HashMap;

use parking_lot::Mutex;

/// Per-player critical/invulnerable state.
///
/// Field semantics:
/// - `invulnerable` is only reachable after having been `critical`
/// - revival clears `critical` and sets `invulnerable` in one mutator call
/// - timestamps never move backward
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerState {
    /// Player is in the recoverable near-death condition.
    pub critical: bool,
    /// Damage is currently fully absorbed.
    pub invulnerable: bool,
    /// Countdown in seconds; invulnerability exits when it reaches 0.
    pub invulnerability_remaining: f32,
    /// Session-seconds of the most recent critical entry. Drives the
    /// dedup window. Monotonically non-decreasing.
    pub last_critical_entered_at: f64,
    /// Session-seconds of the most recent successful revival, if any.
    /// Drives the revival cooldown.
    pub last_revival_at: Option<f64>,
    /// Last known possession of the revival resource. Eventually consistent
    /// for remote players; authoritative only for the local player.
    pub has_resource: bool,
    /// Saved detection-sensitivity value, present only while the stealth
    /// suppression side effect is active. Restored and cleared on exit.
    pub saved_awareness: Option<f32>,
}

/// The single point of truth for this peer's view of all players.
///
/// Both the simulation tick and asynchronous network callbacks mutate
/// entries, so every access funnels through one mutex. Operations under the
/// lock are plain field work; nothing blocks while holding it.
pub struct Registry {
    players: Mutex<HashMap<String, PlayerState>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            players: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a snapshot of the player's state, or the default state if
    /// this id has never been observed. Never inserts.
    #[must_use]
    pub fn get(&self, id: &str) -> PlayerState {
        self.players.lock().get(id).cloned().unwrap_or_default()
    }

    /// Applies an atomic read-modify-write to the player's state, creating
    /// the default entry first if absent.
    ///
    /// This is the single choke point for mutation: the mutator closure runs
    /// under the registry lock, so a tick-context write and a
    /// network-callback write can never interleave on the same entry.
    pub fn set<F>(&self, id: &str, mutate: F)
    where
        F: FnOnce(&mut PlayerState),
    {
        let mut players = self.players.lock();
        mutate(players.entry(id.to_owned()).or_default());
    }

    /// Reads a value out of the player's state without cloning the whole
    /// entry. Unknown ids are read as the default state; nothing is
    /// inserted.
    pub fn read<R, F>(&self, id: &str, f: F) -> R
    where
        F: FnOnce(&PlayerState) -> R,
    {
        let players = self.players.lock();
        match players.get(id) {
            Some(state) => f(state),
            None => f(&PlayerState::default()),
        }
    }

    /// Returns the ids of every player this peer has observed.
    #[must_use]
    pub fn player_ids(&self) -> Vec<String> {
        self.players.lock().keys().cloned().collect()
    }

    /// Returns the number of tracked players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    /// Returns true if no player has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_of_unknown_ids_see_default_without_inserting() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        let state = registry.get("p1");
        assert!(!state.critical);
        assert!(!state.invulnerable);
        assert_eq!(state.invulnerability_remaining, 0.0);
        assert_eq!(state.last_revival_at, None);
        assert!(!registry.read("p1", |s| s.critical));

        // Only mutation creates entries.
        assert!(registry.is_empty());
        registry.set("p1", |s| s.has_resource = true);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_is_read_modify_write() {
        let registry = Registry::new();

        registry.set("p1", |s| s.has_resource = true);
        registry.set("p1", |s| s.critical = true);

        let state = registry.get("p1");
        assert!(state.has_resource);
        assert!(state.critical);
    }

    #[test]
    fn test_exactly_one_state_per_identity() {
        let registry = Registry::new();
        registry.set("p1", |s| s.critical = true);
        registry.set("p1", |s| s.critical = false);
        registry.set("p2", |s| s.has_resource = true);

        assert_eq!(registry.len(), 2);
        let mut ids = registry.player_ids();
        ids.sort();
        assert_eq!(ids, vec!["p1".to_owned(), "p2".to_owned()]);
    }

    #[test]
    fn test_concurrent_mutation_is_serialized() {
        use std::sync::Arc;

        let registry = Arc::new(Registry::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    registry.set("p1", |s| {
                        s.invulnerability_remaining += 1.0;
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let state = registry.get("p1");
        assert_eq!(state.invulnerability_remaining, 8000.0);
    }
}
