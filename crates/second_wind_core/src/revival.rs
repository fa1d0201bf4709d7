//! # Revival Action Handler
//!
//! Processes manual and peer-assisted revival attempts.
//!
//! ## Success Path
//!
//! ```text
//! 1. Preconditions: critical -> cooldown -> resource (first failure wins)
//! 2. Consume the resource (best-effort, NOT transactional)
//! 3. Generous heal across all regions + vitals restore
//! 4. Atomically: critical=false, invulnerable=true, start 10s timer
//! 5. Emit CriticalCleared (+ PossessionChanged on consume)
//! ```
//!
//! Stealth is NOT restored on revival - only when the invulnerability timer
//! later expires, or defensively if critical clears through any other path.

use crate::config::RevivalConfig;
use crate::events::{EventChannel, StateEvent};
use crate::policy::BodyRegion;
use crate::registry::Registry;
use crate::timers::CountdownTimers;
use crate::traits::{PerceptionControl, ResourceOracle, VitalsEngine};

/// Heal applied to vital regions on revival.
const VITAL_HEAL: f32 = 100.0;
/// Heal applied to the remaining regions on revival.
const LIMB_HEAL: f32 = 80.0;

/// Outcome of a revival attempt. The failure variants are expected,
/// user-visible policy rejects - not errors - and cause no state change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RevivalOutcome {
    /// The player was revived and is temporarily invulnerable.
    Success,
    /// The player holds no revival resource.
    NoResource,
    /// The revival cooldown has not elapsed yet.
    OnCooldown {
        /// Seconds until the next revival is allowed. Always positive.
        remaining_secs: f64,
    },
    /// The player is not in the critical state.
    NotCritical,
}

/// Outcome of starting a peer-assisted revival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssistStart {
    /// The assist is running; it completes after the configured hold time.
    Started,
    /// Someone else is already reviving this player.
    AlreadyInProgress,
    /// The downed player is not actually critical.
    NotCritical,
    /// The reviver holds no revival resource.
    NoResource,
}

/// A peer-assisted revival in progress, keyed by the downed player's id.
///
/// Tick-polled; cancelled when the reviver leaves range or the critical
/// state clears through any path. Cancellation is idempotent - the entry is
/// simply removed from the session's table.
#[derive(Clone, Debug)]
pub struct AssistedRevival {
    /// The player being revived.
    pub downed_id: String,
    /// The peer performing the revival.
    pub reviver_id: String,
    /// Seconds of uninterrupted progress so far.
    pub progress_secs: f32,
}

/// The revival action handler.
pub struct RevivalHandler {
    config: RevivalConfig,
}

impl RevivalHandler {
    /// Creates the handler from the session configuration.
    #[must_use]
    pub fn new(config: RevivalConfig) -> Self {
        Self { config }
    }

    /// Processes a manual (self-administered) revival attempt.
    ///
    /// Precondition order: not critical, cooldown, resource. The resource is
    /// consumed from the player's own inventory.
    #[allow(clippy::too_many_arguments)]
    pub fn attempt_revival<O, V>(
        &self,
        registry: &Registry,
        oracle: &mut O,
        vitals: &mut V,
        timers: &mut CountdownTimers,
        events: &EventChannel<StateEvent>,
        player_id: &str,
        now: f64,
    ) -> RevivalOutcome
    where
        O: ResourceOracle,
        V: VitalsEngine,
    {
        let state = registry.get(player_id);

        if !state.critical {
            return RevivalOutcome::NotCritical;
        }

        if let Some(last) = state.last_revival_at {
            let elapsed = now - last;
            if elapsed < self.config.revival_cooldown_secs {
                return RevivalOutcome::OnCooldown {
                    remaining_secs: self.config.revival_cooldown_secs - elapsed,
                };
            }
        }

        if !self.config.testing_override && !oracle.has_revival_resource(player_id) {
            return RevivalOutcome::NoResource;
        }

        self.complete_revival(registry, oracle, vitals, timers, events, player_id, player_id, now);
        RevivalOutcome::Success
    }

    /// The shared success path: consume from `consume_from`, heal, flip the
    /// state atomically, start the invulnerability timer, emit events.
    ///
    /// `consume_from` is the downed player for self-revival and the reviver
    /// for an assisted one.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn complete_revival<O, V>(
        &self,
        registry: &Registry,
        oracle: &mut O,
        vitals: &mut V,
        timers: &mut CountdownTimers,
        events: &EventChannel<StateEvent>,
        player_id: &str,
        consume_from: &str,
        now: f64,
    ) where
        O: ResourceOracle,
        V: VitalsEngine,
    {
        // Best-effort consumption. Bookkeeping is not transactional with the
        // state transition: a failure is logged and the revival proceeds.
        let mut consumed = false;
        if !self.config.testing_override {
            match oracle.consume_revival_resource(consume_from) {
                Ok(_) => consumed = true,
                Err(err) => {
                    tracing::warn!(
                        player = consume_from,
                        %err,
                        "revival resource consumption failed, reviving anyway"
                    );
                }
            }
        }

        // Generous heal, strictly more than the interception clamp leaves.
        for region in BodyRegion::ALL {
            let heal = if region.is_vital() { VITAL_HEAL } else { LIMB_HEAL };
            vitals.change_health(player_id, region, heal);
        }
        vitals.restore_vitals(player_id);

        // Revival clears critical and grants invulnerability in one mutator:
        // no observer can see both flags down, or both newly up, at once.
        registry.set(player_id, |state| {
            state.critical = false;
            state.invulnerable = true;
            state.invulnerability_remaining = self.config.invulnerability_duration_secs;
            state.last_revival_at = Some(match state.last_revival_at {
                Some(prev) => prev.max(now),
                None => now,
            });
        });
        timers.start(player_id, self.config.invulnerability_duration_secs);

        events.emit(StateEvent::CriticalCleared {
            player_id: player_id.to_owned(),
        });
        if consumed {
            events.emit(StateEvent::PossessionChanged {
                player_id: consume_from.to_owned(),
                has_resource: oracle.has_revival_resource(consume_from),
            });
        }

        tracing::info!(
            player = player_id,
            reviver = consume_from,
            invulnerable_for = self.config.invulnerability_duration_secs,
            "player revived"
        );
    }

    /// Ends the protection window: clears invulnerability and restores the
    /// saved detection sensitivity.
    ///
    /// Idempotent, and safe to call for a player who left critical state
    /// without ever being revived - the defensive path the timer expiry and
    /// any other critical-exit route share.
    pub fn release_protection<P>(
        &self,
        registry: &Registry,
        senses: &mut P,
        timers: &mut CountdownTimers,
        player_id: &str,
    ) where
        P: PerceptionControl,
    {
        timers.cancel(player_id);

        let mut restore = None;
        registry.set(player_id, |state| {
            state.invulnerable = false;
            state.invulnerability_remaining = 0.0;
            restore = state.saved_awareness.take();
        });

        if let Some(awareness) = restore {
            senses.set_awareness(player_id, awareness);
            tracing::info!(player = player_id, "protection ended, stealth restored");
        }
    }
}
