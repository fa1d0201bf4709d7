//! End-to-end verification of the critical state lifecycle against a single
//! session: lethal hit, suppression, revival, protection window, expiry, and
//! the cooldown that follows.

use second_wind_core::traits::{MockOracle, MockSenses, MockVitals, PerceptionControl};
use second_wind_core::{
    BodyRegion, DamageKind, RevivalConfig, RevivalOutcome, Session, StateEvent,
};

fn session() -> Session<MockOracle, MockVitals, MockSenses> {
    Session::new(
        RevivalConfig::default(),
        MockOracle::new(),
        MockVitals::new(),
        MockSenses::new(),
    )
}

#[test]
fn test_full_lifecycle_down_revive_expire() {
    let mut s = session();
    let rx = s.event_receiver();
    let gate = s.suppression_gate();

    s.oracle_mut().grant("p1");
    s.senses_mut().place("p1", (10.0, 2.0, -4.0));
    s.announce_possession("p1");

    // Lethal chest hit gets intercepted instead of killing.
    s.tick(1.0);
    let decision = s.before_apply_damage("p1", 120.0, BodyRegion::Chest, DamageKind::Ballistic);
    assert!(decision.allow);
    assert!(decision.adjusted_damage < 120.0);

    let state = s.registry().get("p1");
    assert!(state.critical);
    assert!(gate.is_suppressed("p1"));
    assert_eq!(s.senses_mut().awareness("p1"), 0.0);

    // A follow-up kill attempt inside the dedup window is blocked.
    assert!(!s.before_kill("p1", DamageKind::Ballistic));

    // Revive: protection up, critical down, AI still suppressed.
    assert_eq!(s.attempt_revival("p1"), RevivalOutcome::Success);
    let revived = s.registry().get("p1");
    assert!(!revived.critical);
    assert!(revived.invulnerable);
    assert!(gate.is_suppressed("p1"));

    // Damage during the window is fully absorbed.
    let during = s.before_apply_damage("p1", 999.0, BodyRegion::Head, DamageKind::Explosion);
    assert!(!during.allow);
    assert_eq!(during.adjusted_damage, 0.0);

    // Window expires; stealth comes back and suppression lifts.
    s.tick(10.5);
    let after = s.registry().get("p1");
    assert!(!after.invulnerable);
    assert!(!gate.is_suppressed("p1"));
    assert_eq!(s.senses_mut().awareness("p1"), 1.0);

    // Ordered event trail: possession, entry, cleared, possession update.
    let events: Vec<StateEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 4);
    assert!(matches!(
        &events[0],
        StateEvent::PossessionChanged { player_id, has_resource: true } if player_id == "p1"
    ));
    match &events[1] {
        StateEvent::CriticalEntered { player_id, position, time } => {
            assert_eq!(player_id, "p1");
            assert_eq!(*position, (10.0, 2.0, -4.0));
            assert_eq!(*time, 1.0);
        }
        other => panic!("expected CriticalEntered, got {other:?}"),
    }
    assert!(matches!(
        &events[2],
        StateEvent::CriticalCleared { player_id } if player_id == "p1"
    ));
    assert!(matches!(
        &events[3],
        StateEvent::PossessionChanged { player_id, has_resource: false } if player_id == "p1"
    ));
}

#[test]
fn test_cooldown_spans_revivals_not_critical_entries() {
    let mut s = session();

    // First down and revive at ~t=1.
    s.oracle_mut().grant("p1");
    s.tick(1.0);
    let _ = s.before_apply_damage("p1", 120.0, BodyRegion::Chest, DamageKind::Ballistic);
    assert_eq!(s.attempt_revival("p1"), RevivalOutcome::Success);

    // Down again a minute later: entering critical is always allowed.
    s.tick(60.0);
    s.oracle_mut().grant("p1");
    let decision = s.before_apply_damage("p1", 120.0, BodyRegion::Chest, DamageKind::Ballistic);
    assert!(decision.allow);
    assert!(s.registry().get("p1").critical);

    // But a second self-revival is not, until 180s have passed.
    match s.attempt_revival("p1") {
        RevivalOutcome::OnCooldown { remaining_secs } => {
            assert!(remaining_secs > 119.0 && remaining_secs < 121.0);
        }
        other => panic!("expected OnCooldown, got {other:?}"),
    }

    s.tick(121.0);
    assert_eq!(s.attempt_revival("p1"), RevivalOutcome::Success);
}

#[test]
fn test_dead_player_without_resource_stays_dead() {
    let mut s = session();
    s.tick(1.0);

    let decision = s.before_apply_damage("p1", 120.0, BodyRegion::Head, DamageKind::Ballistic);
    assert!(decision.allow);
    assert_eq!(decision.adjusted_damage, 120.0);
    assert!(s.before_kill("p1", DamageKind::Ballistic));
    assert!(!s.registry().get("p1").critical);
}
