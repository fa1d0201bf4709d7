//! # AI Suppression Gate
//!
//! Read-only view the host's AI layer consults before letting a bot target a
//! player. A player who is critical or invulnerable is not a valid target.
//!
//! The gate holds a shared handle to the registry, so the AI layer can query
//! it from its own update loop without going through the session.

use std::sync::Arc;

use crate::registry::Registry;

/// Read-only targeting gate over the shared player registry.
#[derive(Clone)]
pub struct SuppressionGate {
    registry: Arc<Registry>,
}

impl SuppressionGate {
    /// Creates a gate over the given registry.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Returns true when AI must not target or attack this player.
    ///
    /// Unknown players are not suppressed, and querying one leaves the
    /// registry untouched.
    #[must_use]
    pub fn is_suppressed(&self, player_id: &str) -> bool {
        self.registry
            .read(player_id, |state| state.critical || state.invulnerable)
    }
}
