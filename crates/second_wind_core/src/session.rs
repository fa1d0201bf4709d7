//! # Revival Session
//!
//! The per-match orchestrator. Owns the registry, the damage policy, the
//! revival handler, the countdown timers, the assisted-revival table, and the
//! host collaborators; advances a session-seconds clock from the simulation
//! tick.
//!
//! ## Host Integration Points
//!
//! - [`Session::before_apply_damage`] from the damage pipeline
//! - [`Session::before_kill`] from the kill path (second line of defense)
//! - [`Session::attempt_revival`] from the input/interaction layer
//! - [`Session::tick`] once per simulation frame
//! - [`Session::suppression_gate`] handed to the AI layer
//! - [`Session::event_receiver`] drained by the replication layer

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RevivalConfig;
use crate::events::{EventChannel, StateEvent};
use crate::policy::{BodyRegion, DamageKind, DamagePolicy, Mitigation};
use crate::registry::Registry;
use crate::revival::{AssistStart, AssistedRevival, RevivalHandler, RevivalOutcome};
use crate::suppression::SuppressionGate;
use crate::timers::CountdownTimers;
use crate::traits::{PerceptionControl, ResourceOracle, VitalsEngine};

/// The per-match revival session.
pub struct Session<O, V, P> {
    config: RevivalConfig,
    registry: Arc<Registry>,
    policy: DamagePolicy,
    revival: RevivalHandler,
    timers: CountdownTimers,
    assists: HashMap<String, AssistedRevival>,
    events: EventChannel<StateEvent>,
    oracle: O,
    vitals: V,
    senses: P,
    clock: f64,
}

impl<O, V, P> Session<O, V, P>
where
    O: ResourceOracle,
    V: VitalsEngine,
    P: PerceptionControl,
{
    /// Creates a session at clock zero.
    #[must_use]
    pub fn new(config: RevivalConfig, oracle: O, vitals: V, senses: P) -> Self {
        Self {
            policy: DamagePolicy::new(config.clone()),
            revival: RevivalHandler::new(config.clone()),
            config,
            registry: Arc::new(Registry::new()),
            timers: CountdownTimers::new(),
            assists: HashMap::new(),
            events: EventChannel::default(),
            oracle,
            vitals,
            senses,
            clock: 0.0,
        }
    }

    /// Current session time in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Shared handle to the player state registry. The replication layer
    /// applies remote events through this.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Read-only targeting gate for the host's AI layer.
    #[must_use]
    pub fn suppression_gate(&self) -> SuppressionGate {
        SuppressionGate::new(Arc::clone(&self.registry))
    }

    /// Receiver end of the outbound state-event stream.
    #[must_use]
    pub fn event_receiver(&self) -> crossbeam_channel::Receiver<StateEvent> {
        self.events.receiver()
    }

    /// The inventory collaborator, for host-side bookkeeping.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// The health collaborator.
    pub fn vitals_mut(&mut self) -> &mut V {
        &mut self.vitals
    }

    /// The perception collaborator.
    pub fn senses_mut(&mut self) -> &mut P {
        &mut self.senses
    }

    /// Advances the session by one simulation frame.
    ///
    /// Expires invulnerability windows (restoring stealth), mirrors the
    /// remaining protection time into the registry, releases stealth for
    /// players whose critical state cleared through any non-revival path,
    /// and drives assisted revivals to completion or cancellation.
    pub fn tick(&mut self, dt: f32) {
        self.clock += f64::from(dt);

        for player_id in self.timers.tick(dt) {
            self.revival.release_protection(
                &self.registry,
                &mut self.senses,
                &mut self.timers,
                &player_id,
            );
        }

        for player_id in self.registry.player_ids() {
            if let Some(remaining) = self.timers.remaining(&player_id) {
                self.registry.set(&player_id, |state| {
                    state.invulnerability_remaining = remaining;
                });
                continue;
            }

            // Critical can clear without a local revival (a remote peer
            // revived the player, or the host cleared it directly). Stealth
            // and protection must still be released.
            let stuck = self.registry.read(&player_id, |state| {
                !state.critical && !state.invulnerable && state.saved_awareness.is_some()
            });
            if stuck {
                self.revival.release_protection(
                    &self.registry,
                    &mut self.senses,
                    &mut self.timers,
                    &player_id,
                );
            }
        }

        self.tick_assists(dt);
    }

    /// Intercepts one pending damage application from the host's pipeline.
    pub fn before_apply_damage(
        &mut self,
        player_id: &str,
        damage: f32,
        region: BodyRegion,
        kind: DamageKind,
    ) -> Mitigation {
        self.policy.intercept(
            &self.registry,
            &self.oracle,
            &self.vitals,
            &mut self.senses,
            &self.events,
            player_id,
            damage,
            region,
            kind,
            self.clock,
        )
    }

    /// Second line of defense on the host's kill path.
    ///
    /// Returns true when the kill should proceed. A kill reaching a player
    /// the interception already put into critical state, or who still
    /// qualifies for one, is converted into a critical entry instead; fatal
    /// damage absorbed upstream must never double-apply as a death.
    pub fn before_kill(&mut self, player_id: &str, kind: DamageKind) -> bool {
        let state = self.registry.get(player_id);

        if state.invulnerable {
            tracing::warn!(player = player_id, ?kind, "blocked kill on invulnerable player");
            return false;
        }

        if state.critical
            && self.clock - state.last_critical_entered_at < self.config.critical_dedup_window_secs
        {
            tracing::warn!(player = player_id, ?kind, "blocked kill inside dedup window");
            self.floor_vital_regions(player_id);
            return false;
        }

        if self.config.testing_override || self.oracle.has_revival_resource(player_id) {
            self.policy.force_critical(
                &self.registry,
                &mut self.senses,
                &self.events,
                player_id,
                self.clock,
            );
            self.floor_vital_regions(player_id);
            tracing::warn!(
                player = player_id,
                ?kind,
                "kill converted into critical entry"
            );
            return false;
        }

        true
    }

    /// Processes a manual revival attempt for this peer's player.
    pub fn attempt_revival(&mut self, player_id: &str) -> RevivalOutcome {
        self.revival.attempt_revival(
            &self.registry,
            &mut self.oracle,
            &mut self.vitals,
            &mut self.timers,
            &self.events,
            player_id,
            self.clock,
        )
    }

    /// Starts a peer-assisted revival of `downed_id` by `reviver_id`.
    ///
    /// The assist completes after the configured hold time if the reviver
    /// stays within the abort range; it consumes the reviver's resource, not
    /// the downed player's, and bypasses the downed player's cooldown.
    pub fn begin_assisted_revival(&mut self, reviver_id: &str, downed_id: &str) -> AssistStart {
        if !self.registry.read(downed_id, |state| state.critical) {
            return AssistStart::NotCritical;
        }
        if self.assists.contains_key(downed_id) {
            return AssistStart::AlreadyInProgress;
        }
        if !self.config.testing_override && !self.oracle.has_revival_resource(reviver_id) {
            return AssistStart::NoResource;
        }

        self.assists.insert(
            downed_id.to_owned(),
            AssistedRevival {
                downed_id: downed_id.to_owned(),
                reviver_id: reviver_id.to_owned(),
                progress_secs: 0.0,
            },
        );
        tracing::info!(downed = downed_id, reviver = reviver_id, "assisted revival started");
        AssistStart::Started
    }

    /// Cancels an assisted revival of `downed_id`, if one is running.
    /// Idempotent.
    pub fn cancel_assisted_revival(&mut self, downed_id: &str) {
        if self.assists.remove(downed_id).is_some() {
            tracing::info!(downed = downed_id, "assisted revival cancelled");
        }
    }

    /// Progress of a running assist on `downed_id`, in seconds.
    #[must_use]
    pub fn assist_progress(&self, downed_id: &str) -> Option<f32> {
        self.assists.get(downed_id).map(|a| a.progress_secs)
    }

    /// Announces this player's resource possession to the session, for the
    /// replication layer to broadcast. Called once when a peer's player
    /// spawns.
    pub fn announce_possession(&mut self, player_id: &str) {
        let has_resource =
            self.config.testing_override || self.oracle.has_revival_resource(player_id);
        self.registry.set(player_id, |state| {
            state.has_resource = has_resource;
        });
        self.events.emit(StateEvent::PossessionChanged {
            player_id: player_id.to_owned(),
            has_resource,
        });
    }

    /// Advances every running assist, cancelling the ones whose preconditions
    /// lapsed and completing the ones that held long enough.
    fn tick_assists(&mut self, dt: f32) {
        let mut table = std::mem::take(&mut self.assists);
        let mut completed = Vec::new();

        table.retain(|downed_id, assist| {
            if !self.registry.read(downed_id, |state| state.critical) {
                tracing::info!(downed = downed_id, "assist dropped, player no longer critical");
                return false;
            }
            if !self.within_assist_range(&assist.reviver_id, downed_id) {
                tracing::info!(
                    downed = downed_id,
                    reviver = assist.reviver_id,
                    "assist aborted, reviver out of range"
                );
                return false;
            }

            assist.progress_secs += dt;
            if assist.progress_secs >= self.config.assist_duration_secs {
                completed.push(assist.clone());
                return false;
            }
            true
        });

        self.assists = table;

        for assist in completed {
            self.revival.complete_revival(
                &self.registry,
                &mut self.oracle,
                &mut self.vitals,
                &mut self.timers,
                &self.events,
                &assist.downed_id,
                &assist.reviver_id,
                self.clock,
            );
        }
    }

    /// Range check with the grace margin. An unknown position on either side
    /// counts as out of range.
    fn within_assist_range(&self, reviver_id: &str, downed_id: &str) -> bool {
        let (Some(a), Some(b)) = (
            self.senses.position_of(reviver_id),
            self.senses.position_of(downed_id),
        ) else {
            return false;
        };
        let (dx, dy, dz) = (a.0 - b.0, a.1 - b.1, a.2 - b.2);
        let limit = self.config.assist_abort_range();
        dx * dx + dy * dy + dz * dz <= limit * limit
    }

    /// Nudges emptied vital pools back to a positive floor so the host's
    /// own death check cannot re-fire after a blocked kill.
    fn floor_vital_regions(&mut self, player_id: &str) {
        for region in BodyRegion::ALL {
            if !region.is_vital() {
                continue;
            }
            if let Some(health) = self.vitals.current_health(player_id, region) {
                if health < 1.0 {
                    self.vitals.change_health(player_id, region, 1.0 - health);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockOracle, MockSenses, MockVitals};

    fn session() -> Session<MockOracle, MockVitals, MockSenses> {
        Session::new(
            RevivalConfig::default(),
            MockOracle::new(),
            MockVitals::new(),
            MockSenses::new(),
        )
    }

    fn down(session: &mut Session<MockOracle, MockVitals, MockSenses>, id: &str) {
        session.oracle_mut().grant(id);
        let decision =
            session.before_apply_damage(id, 60.0, BodyRegion::Chest, DamageKind::Ballistic);
        assert!(decision.allow);
        assert!(session.registry().get(id).critical);
    }

    #[test]
    fn test_invulnerability_expires_through_tick() {
        let mut s = session();
        down(&mut s, "p1");
        s.senses_mut().set_awareness("p1", 0.0);

        s.oracle_mut().grant("p1");
        assert_eq!(s.attempt_revival("p1"), RevivalOutcome::Success);
        assert!(s.registry().get("p1").invulnerable);

        s.tick(4.0);
        let mid = s.registry().get("p1");
        assert!(mid.invulnerable);
        assert!((mid.invulnerability_remaining - 6.0).abs() < 1e-4);

        s.tick(6.1);
        let after = s.registry().get("p1");
        assert!(!after.invulnerable);
        assert_eq!(after.invulnerability_remaining, 0.0);
        // Stealth restored to the value saved at critical entry.
        assert_eq!(after.saved_awareness, None);
        assert_eq!(s.senses_mut().awareness("p1"), 1.0);
    }

    #[test]
    fn test_stealth_released_when_critical_clears_without_local_revival() {
        let mut s = session();
        s.senses_mut().set_awareness("p1", 0.9);
        down(&mut s, "p1");
        assert_eq!(s.senses_mut().awareness("p1"), 0.0);
        assert_eq!(s.registry().get("p1").saved_awareness, Some(0.9));

        // A remote peer revived the player: replication only clears the
        // critical flag, never the stealth bookkeeping.
        s.registry().set("p1", |st| st.critical = false);
        s.tick(0.1);

        let state = s.registry().get("p1");
        assert_eq!(state.saved_awareness, None);
        assert!(!state.invulnerable);
        assert_eq!(state.invulnerability_remaining, 0.0);
        assert_eq!(s.senses_mut().awareness("p1"), 0.9);
    }

    #[test]
    fn test_before_kill_blocks_when_revivable() {
        let mut s = session();
        s.oracle_mut().grant("p1");
        s.vitals_mut().set_health("p1", BodyRegion::Head, 0.0);

        assert!(!s.before_kill("p1", DamageKind::Ballistic));
        let state = s.registry().get("p1");
        assert!(state.critical);
        // Vital pools floored so the host's death check cannot re-fire.
        assert_eq!(
            s.vitals_mut().current_health("p1", BodyRegion::Head),
            Some(1.0)
        );
    }

    #[test]
    fn test_before_kill_allows_normal_death() {
        let mut s = session();
        assert!(s.before_kill("p1", DamageKind::Explosion));
        assert!(!s.registry().get("p1").critical);
    }

    #[test]
    fn test_before_kill_blocks_inside_dedup_window() {
        let mut s = session();
        down(&mut s, "p1");
        // Resource was not consumed by entry, so drain it to prove the dedup
        // branch blocks on its own.
        let _ = s.oracle_mut().consume_revival_resource("p1");

        s.tick(2.0);
        assert!(!s.before_kill("p1", DamageKind::Ballistic));
    }

    #[test]
    fn test_assisted_revival_completes_and_consumes_reviver_resource() {
        let mut s = session();
        down(&mut s, "p1");
        s.oracle_mut().grant("medic");
        s.senses_mut().place("p1", (0.0, 0.0, 0.0));
        s.senses_mut().place("medic", (1.0, 0.0, 0.0));

        assert_eq!(s.begin_assisted_revival("medic", "p1"), AssistStart::Started);
        assert_eq!(
            s.begin_assisted_revival("medic", "p1"),
            AssistStart::AlreadyInProgress
        );

        s.tick(1.5);
        assert!(s.assist_progress("p1").is_some());
        s.tick(1.6);

        assert!(s.assist_progress("p1").is_none());
        let state = s.registry().get("p1");
        assert!(!state.critical);
        assert!(state.invulnerable);
        assert!(!s.oracle_mut().has_revival_resource("medic"));
        // The downed player's own resource was untouched.
        assert!(s.oracle_mut().has_revival_resource("p1"));
    }

    #[test]
    fn test_assist_aborts_outside_grace_range() {
        let mut s = session();
        down(&mut s, "p1");
        s.oracle_mut().grant("medic");
        s.senses_mut().place("p1", (0.0, 0.0, 0.0));
        s.senses_mut().place("medic", (1.0, 0.0, 0.0));

        assert_eq!(s.begin_assisted_revival("medic", "p1"), AssistStart::Started);
        s.tick(1.0);

        // Beyond 2.0 * 1.5 world units.
        s.senses_mut().place("medic", (4.0, 0.0, 0.0));
        s.tick(1.0);

        assert!(s.assist_progress("p1").is_none());
        assert!(s.registry().get("p1").critical);
        assert!(s.oracle_mut().has_revival_resource("medic"));
    }

    #[test]
    fn test_assist_requires_reviver_resource() {
        let mut s = session();
        down(&mut s, "p1");
        assert_eq!(
            s.begin_assisted_revival("medic", "p1"),
            AssistStart::NoResource
        );
        assert_eq!(s.begin_assisted_revival("medic", "p2"), AssistStart::NotCritical);
    }

    #[test]
    fn test_announce_possession_emits_event() {
        let mut s = session();
        s.oracle_mut().grant("p1");
        let rx = s.event_receiver();

        s.announce_possession("p1");

        assert!(s.registry().get("p1").has_resource);
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::PossessionChanged {
                player_id: "p1".to_owned(),
                has_resource: true,
            }
        );
    }

    #[test]
    fn test_cancel_assist_is_idempotent() {
        let mut s = session();
        down(&mut s, "p1");
        s.oracle_mut().grant("medic");
        s.senses_mut().place("p1", (0.0, 0.0, 0.0));
        s.senses_mut().place("medic", (0.5, 0.0, 0.0));

        assert_eq!(s.begin_assisted_revival("medic", "p1"), AssistStart::Started);
        s.cancel_assisted_revival("p1");
        s.cancel_assisted_revival("p1");
        assert!(s.assist_progress("p1").is_none());
    }
}
