//! # SECOND WIND Core - The Critical State Machine
//!
//! A player who would otherwise die instead enters a recoverable "critical"
//! state, from which self- or peer-administered revival restores them with a
//! temporary invulnerability window.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     REVIVAL SESSION                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Damage       │  │ Revival      │  │ Suppression  │      │
//! │  │ Policy       │  │ Handler      │  │ Gate (read)  │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │         │                 │                 │               │
//! │         └────────────────┼─────────────────┘               │
//! │                          │                                  │
//! │              ┌───────────▼───────────┐                     │
//! │              │ Player State Registry │ ◄── network apply   │
//! │              │ (single choke point)  │                     │
//! │              └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Safety-Critical Rules
//!
//! - Fatal damage that was absorbed must NEVER double-apply as a death.
//! - All registry mutation goes through one mutex; the simulation tick and
//!   network callbacks never race on a player's state.
//! - No operation in this crate blocks or suspends; everything completes
//!   within the calling tick.
//!
//! ## Example
//!
//! ```rust,ignore
//! use second_wind_core::{RevivalConfig, Session};
//!
//! let mut session = Session::new(RevivalConfig::default(), oracle, vitals, senses);
//! let decision = session.before_apply_damage("p1", 50.0, BodyRegion::Chest, DamageKind::Ballistic);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod revival;
pub mod session;
pub mod suppression;
pub mod timers;
pub mod traits;

// Re-exports for convenience
pub use config::RevivalConfig;
pub use error::ConsumeError;
pub use events::{EventChannel, StateEvent};
pub use policy::{BodyRegion, DamageKind, DamagePolicy, Mitigation};
pub use registry::{PlayerState, Registry};
pub use revival::{AssistStart, RevivalHandler, RevivalOutcome};
pub use session::Session;
pub use suppression::SuppressionGate;
pub use timers::CountdownTimers;
pub use traits::{Consumed, PerceptionControl, ResourceOracle, VitalsEngine};

/// Seconds of temporary invulnerability granted by a successful revival.
pub const INVULNERABILITY_DURATION_SECS: f32 = 10.0;

/// Window after entering critical state during which repeated damage only
/// clamps instead of re-triggering the entry logic.
pub const CRITICAL_DEDUP_WINDOW_SECS: f64 = 5.0;

/// Minimum seconds between two successful revivals of the same player.
pub const REVIVAL_COOLDOWN_SECS: f64 = 180.0;
