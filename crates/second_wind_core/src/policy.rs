//! # Damage Interception Policy
//!
//! Decides, synchronously and before the host applies damage, whether an
//! incoming hit is allowed through, clamped, or fully absorbed.
//!
//! ## Decision Order (first match wins)
//!
//! ```text
//! 1. invulnerable           -> absorb everything, block the original call
//! 2. critical + dedup window-> clamp, let through (no re-entry)
//! 3. lethal or heavy bleed  -> resource present? enter critical + clamp
//!                              resource absent?  pass through (normal death)
//!    neither                -> pass through unchanged
//! ```
//!
//! The policy never fully blocks the originating call in branch 3: it only
//! shrinks the damage value so the downstream kill condition is never
//! reached. Branch 1 is the sole hard block.

use crate::config::RevivalConfig;
use crate::events::{EventChannel, StateEvent};
use crate::registry::Registry;
use crate::traits::{PerceptionControl, ResourceOracle, VitalsEngine};

/// Body regions tracked by the host's health simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyRegion {
    /// Head. Vital.
    Head,
    /// Chest. Vital.
    Chest,
    /// Stomach.
    Stomach,
    /// Left arm.
    LeftArm,
    /// Right arm.
    RightArm,
    /// Left leg.
    LeftLeg,
    /// Right leg.
    RightLeg,
}

impl BodyRegion {
    /// All tracked regions, for whole-body operations like the revival heal.
    pub const ALL: [Self; 7] = [
        Self::Head,
        Self::Chest,
        Self::Stomach,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftLeg,
        Self::RightLeg,
    ];

    /// True for regions where emptying the pool kills outright.
    #[must_use]
    pub const fn is_vital(self) -> bool {
        matches!(self, Self::Head | Self::Chest)
    }
}

/// Classification of the incoming damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageKind {
    /// Projectile hit.
    Ballistic,
    /// Melee / impact.
    Blunt,
    /// Blast damage.
    Explosion,
    /// Ongoing heavy bleed. Always intercepted when a resource is present.
    HeavyBleeding,
    /// Ongoing light bleed. Not intercepted on its own.
    LightBleeding,
    /// Environmental (fall, fire, zone).
    Environment,
}

/// The policy's verdict on one pending damage application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mitigation {
    /// Whether the host should run its original damage path at all.
    pub allow: bool,
    /// The damage value the host should apply instead of the original.
    pub adjusted_damage: f32,
}

impl Mitigation {
    /// Pass the hit through unmodified.
    #[must_use]
    pub const fn pass_through(damage: f32) -> Self {
        Self {
            allow: true,
            adjusted_damage: damage,
        }
    }

    /// Absorb the hit entirely and block the original call.
    #[must_use]
    pub const fn absorb() -> Self {
        Self {
            allow: false,
            adjusted_damage: 0.0,
        }
    }

    /// Let a reduced hit through.
    #[must_use]
    pub const fn clamped(damage: f32) -> Self {
        Self {
            allow: true,
            adjusted_damage: damage,
        }
    }
}

/// The damage interception policy.
///
/// Stateless apart from configuration; all player state lives in the
/// [`Registry`].
pub struct DamagePolicy {
    config: RevivalConfig,
}

impl DamagePolicy {
    /// Creates the policy from the session configuration.
    #[must_use]
    pub fn new(config: RevivalConfig) -> Self {
        Self { config }
    }

    /// Intercepts one pending damage application.
    ///
    /// Called synchronously from the simulation tick before the host applies
    /// damage. May enter the critical state, emit a `CriticalEntered` event,
    /// and apply the stealth side effect.
    #[allow(clippy::too_many_arguments)]
    pub fn intercept<O, V, P>(
        &self,
        registry: &Registry,
        oracle: &O,
        vitals: &V,
        senses: &mut P,
        events: &EventChannel<StateEvent>,
        player_id: &str,
        damage: f32,
        region: BodyRegion,
        kind: DamageKind,
        now: f64,
    ) -> Mitigation
    where
        O: ResourceOracle,
        V: VitalsEngine,
        P: PerceptionControl,
    {
        let state = registry.get(player_id);

        // Branch 1: full absorption while invulnerable. No state change, no
        // event.
        if state.invulnerable {
            tracing::debug!(player = player_id, damage, "absorbed hit while invulnerable");
            return Mitigation::absorb();
        }

        // Branch 2: already critical and inside the dedup window. Clamp so
        // bleed effects still land but the entry logic cannot re-trigger.
        if state.critical && now - state.last_critical_entered_at < self.config.critical_dedup_window_secs
        {
            return Mitigation::clamped(damage.min(self.config.critical_damage_clamp));
        }

        // Branch 3: classify severity.
        let lethal = self.is_lethal(vitals, player_id, damage, region);
        let heavy_bleed = kind == DamageKind::HeavyBleeding;
        if !lethal && !heavy_bleed {
            return Mitigation::pass_through(damage);
        }

        // Qualifying hit: intercept only when the player can be revived.
        if !self.config.testing_override && !oracle.has_revival_resource(player_id) {
            return Mitigation::pass_through(damage);
        }

        self.enter_critical(registry, senses, events, player_id, now);
        tracing::info!(
            player = player_id,
            damage,
            ?region,
            ?kind,
            "lethal damage intercepted, player entered critical state"
        );

        if heavy_bleed {
            // Fixed small constant: bleed effects apply, the kill condition
            // does not.
            return Mitigation::clamped(damage.min(self.config.critical_damage_clamp));
        }

        // Lethal hit: leave the region a small positive remainder.
        let adjusted = match vitals.current_health(player_id, region) {
            Some(health) => (health - self.config.lethal_health_buffer).max(1.0),
            None => self.config.critical_damage_clamp,
        };
        Mitigation::clamped(adjusted.min(damage))
    }

    /// Severity classification for one hit.
    fn is_lethal<V: VitalsEngine>(
        &self,
        vitals: &V,
        player_id: &str,
        damage: f32,
        region: BodyRegion,
    ) -> bool {
        if damage > self.config.lethal_damage_threshold {
            return true;
        }
        if region.is_vital() && damage > self.config.vital_lethal_threshold {
            return true;
        }
        self.estimated_fatal(vitals, player_id, damage, region)
    }

    /// Estimates whether a hit would be fatal from current region health.
    ///
    /// Vital-region hits that empty the pool count as fatal even when the
    /// magnitude sits below the fixed thresholds (rounding and
    /// secondary-effect deaths). A failed health query falls back to a fixed
    /// high threshold.
    fn estimated_fatal<V: VitalsEngine>(
        &self,
        vitals: &V,
        player_id: &str,
        damage: f32,
        region: BodyRegion,
    ) -> bool {
        match vitals.current_health(player_id, region) {
            Some(health) => region.is_vital() && damage >= health,
            None => damage > self.config.fallback_fatal_threshold,
        }
    }

    /// Transitions the player into the critical state and fires the side
    /// effects: stealth suppression and the replicated entry event.
    ///
    /// Defensive no-op when the player is already invulnerable - that
    /// combination is excluded by the transition table, so an occurrence is
    /// an invariant violation and must not cascade.
    fn enter_critical<P: PerceptionControl>(
        &self,
        registry: &Registry,
        senses: &mut P,
        events: &EventChannel<StateEvent>,
        player_id: &str,
        now: f64,
    ) {
        let mut entered = false;
        let mut needs_stealth = false;

        registry.set(player_id, |state| {
            if state.invulnerable {
                return;
            }
            state.critical = true;
            state.last_critical_entered_at = state.last_critical_entered_at.max(now);
            needs_stealth = state.saved_awareness.is_none();
            entered = true;
        });
        if !entered {
            tracing::warn!(
                player = player_id,
                "ignored critical entry while invulnerable"
            );
            return;
        }

        if needs_stealth {
            let saved = senses.awareness(player_id);
            senses.set_awareness(player_id, 0.0);
            registry.set(player_id, |state| {
                state.saved_awareness = Some(saved);
            });
        }

        let position = senses.position_of(player_id).unwrap_or((0.0, 0.0, 0.0));
        events.emit(StateEvent::CriticalEntered {
            player_id: player_id.to_owned(),
            position,
            time: now,
        });
    }

    /// Runs the full critical-entry transition outside of a damage
    /// application. Used by the kill hook as the second line of defense.
    pub(crate) fn force_critical<P: PerceptionControl>(
        &self,
        registry: &Registry,
        senses: &mut P,
        events: &EventChannel<StateEvent>,
        player_id: &str,
        now: f64,
    ) {
        self.enter_critical(registry, senses, events, player_id, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockOracle, MockSenses, MockVitals};

    fn policy() -> DamagePolicy {
        DamagePolicy::new(RevivalConfig::default())
    }

    fn harness() -> (Registry, MockOracle, MockVitals, MockSenses, EventChannel<StateEvent>) {
        (
            Registry::new(),
            MockOracle::new(),
            MockVitals::new(),
            MockSenses::new(),
            EventChannel::unbounded(),
        )
    }

    #[test]
    fn test_invulnerable_absorbs_everything() {
        let (registry, oracle, vitals, mut senses, events) = harness();
        registry.set("p1", |s| {
            s.invulnerable = true;
        });

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 500.0, BodyRegion::Head, DamageKind::Ballistic, 1.0,
        );

        assert_eq!(decision, Mitigation::absorb());
        // Registry unchanged, no event queued.
        assert!(!registry.get("p1").critical);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_harmless_damage_passes_through() {
        let (registry, mut oracle, vitals, mut senses, events) = harness();
        oracle.grant("p1");

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 10.0, BodyRegion::LeftLeg, DamageKind::Blunt, 1.0,
        );

        assert_eq!(decision, Mitigation::pass_through(10.0));
        assert!(!registry.get("p1").critical);
    }

    #[test]
    fn test_lethal_without_resource_passes_through() {
        let (registry, oracle, vitals, mut senses, events) = harness();

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 80.0, BodyRegion::Chest, DamageKind::Ballistic, 1.0,
        );

        // Player may die through the normal path.
        assert_eq!(decision, Mitigation::pass_through(80.0));
        assert!(!registry.get("p1").critical);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_lethal_with_resource_enters_critical() {
        let (registry, mut oracle, mut vitals, mut senses, events) = harness();
        oracle.grant("p1");
        vitals.set_health("p1", BodyRegion::Chest, 10.0);
        senses.place("p1", (3.0, 0.0, -7.5));

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 50.0, BodyRegion::Chest, DamageKind::Ballistic, 2.0,
        );

        assert!(decision.allow);
        assert!(decision.adjusted_damage >= 1.0 && decision.adjusted_damage <= 5.0);

        let state = registry.get("p1");
        assert!(state.critical);
        assert!(!state.invulnerable);
        assert_eq!(state.last_critical_entered_at, 2.0);
        assert_eq!(state.saved_awareness, Some(1.0));
        assert_eq!(senses.awareness("p1"), 0.0);

        match events.try_recv().unwrap() {
            StateEvent::CriticalEntered { player_id, position, time } => {
                assert_eq!(player_id, "p1");
                assert_eq!(position, (3.0, 0.0, -7.5));
                assert_eq!(time, 2.0);
            }
            other => panic!("expected CriticalEntered, got {other:?}"),
        }
    }

    #[test]
    fn test_dedup_window_clamps_without_reentry() {
        let (registry, mut oracle, vitals, mut senses, events) = harness();
        oracle.grant("p1");

        let first = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 60.0, BodyRegion::Chest, DamageKind::Ballistic, 10.0,
        );
        assert!(first.allow);
        let entered_at = registry.get("p1").last_critical_entered_at;
        let _ = events.try_recv().unwrap();

        // 3s later, still inside the 5s window: only a clamp, no event.
        let second = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 60.0, BodyRegion::Chest, DamageKind::Ballistic, 13.0,
        );
        assert_eq!(second, Mitigation::clamped(5.0));
        assert_eq!(registry.get("p1").last_critical_entered_at, entered_at);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_heavy_bleed_intercepted_at_fixed_clamp() {
        let (registry, mut oracle, vitals, mut senses, events) = harness();
        oracle.grant("p1");

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 12.0, BodyRegion::Stomach, DamageKind::HeavyBleeding, 1.0,
        );

        assert_eq!(decision, Mitigation::clamped(5.0));
        assert!(registry.get("p1").critical);
    }

    #[test]
    fn test_vital_pool_exhaustion_counts_as_fatal() {
        let (registry, mut oracle, mut vitals, mut senses, events) = harness();
        oracle.grant("p1");
        // 15 damage to a 10-health head: under both fixed thresholds, but
        // the pool empties.
        vitals.set_health("p1", BodyRegion::Head, 10.0);

        let decision = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 15.0, BodyRegion::Head, DamageKind::Ballistic, 1.0,
        );

        assert!(registry.get("p1").critical);
        assert!(decision.adjusted_damage < 10.0);
    }

    #[test]
    fn test_health_query_failure_falls_back() {
        let (registry, mut oracle, mut vitals, mut senses, events) = harness();
        oracle.grant("p1");
        vitals.queries_fail = true;

        // Below the 70 fallback and below fixed thresholds on a limb: pass.
        let low = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 30.0, BodyRegion::LeftArm, DamageKind::Ballistic, 1.0,
        );
        assert_eq!(low, Mitigation::pass_through(30.0));

        // Above the fallback threshold: intercepted, clamp falls back too.
        let high = policy().intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 90.0, BodyRegion::LeftArm, DamageKind::Ballistic, 1.0,
        );
        assert_eq!(high, Mitigation::clamped(5.0));
    }

    #[test]
    fn test_testing_override_bypasses_possession() {
        let config = RevivalConfig {
            testing_override: true,
            ..RevivalConfig::default()
        };
        let policy = DamagePolicy::new(config);
        let (registry, oracle, vitals, mut senses, events) = harness();

        let decision = policy.intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 80.0, BodyRegion::Chest, DamageKind::Ballistic, 1.0,
        );

        assert!(decision.allow);
        assert!(registry.get("p1").critical);
    }

    #[test]
    fn test_adjusted_damage_never_amplifies() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EC0_0D11);
        let p = policy();

        for _ in 0..300 {
            let (registry, mut oracle, vitals, mut senses, events) = harness();
            oracle.grant("p1");
            let damage: f32 = rng.gen_range(0.0..250.0);
            let region = BodyRegion::ALL[rng.gen_range(0..BodyRegion::ALL.len())];

            let decision = p.intercept(
                &registry, &oracle, &vitals, &mut senses, &events,
                "p1", damage, region, DamageKind::Ballistic, 1.0,
            );

            assert!(decision.adjusted_damage >= 0.0);
            assert!(
                decision.adjusted_damage <= damage,
                "amplified {damage} to {} on {region:?}",
                decision.adjusted_damage
            );
        }
    }

    #[test]
    fn test_stealth_saved_once() {
        let (registry, mut oracle, vitals, mut senses, events) = harness();
        oracle.grant("p1");
        senses.set_awareness("p1", 0.8);

        let p = policy();
        let _ = p.intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 60.0, BodyRegion::Chest, DamageKind::Ballistic, 1.0,
        );
        // A second entry outside the dedup window must not overwrite the
        // saved awareness with the zeroed value.
        let _ = p.intercept(
            &registry, &oracle, &vitals, &mut senses, &events,
            "p1", 60.0, BodyRegion::Chest, DamageKind::Ballistic, 10.0,
        );

        assert_eq!(registry.get("p1").saved_awareness, Some(0.8));
    }
}
