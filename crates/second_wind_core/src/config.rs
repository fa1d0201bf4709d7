//! # Configuration Surface
//!
//! The enumerated knobs of the revival system, loadable from TOML once at
//! startup. Defaults carry the tuned values; nothing outside this struct is
//! configurable.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::{CRITICAL_DEDUP_WINDOW_SECS, INVULNERABILITY_DURATION_SECS, REVIVAL_COOLDOWN_SECS};

/// Revival system configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevivalConfig {
    /// Bypasses resource-possession checks everywhere. Testing only.
    pub testing_override: bool,
    /// Template id of the revival-enabling resource.
    pub resource_id: String,
    /// Dedup window after a critical entry, in seconds.
    pub critical_dedup_window_secs: f64,
    /// Cooldown between successful revivals of one player, in seconds.
    pub revival_cooldown_secs: f64,
    /// Invulnerability window granted by a revival, in seconds.
    pub invulnerability_duration_secs: f32,
    /// Damage above this is lethal regardless of region.
    pub lethal_damage_threshold: f32,
    /// Damage above this is lethal when it hits a vital region.
    pub vital_lethal_threshold: f32,
    /// Fallback: damage above this is treated as fatal when the region
    /// health query fails.
    pub fallback_fatal_threshold: f32,
    /// Damage let through while already critical, and for heavy bleeding.
    pub critical_damage_clamp: f32,
    /// Health remainder buffer for the lethal-hit clamp.
    pub lethal_health_buffer: f32,
    /// Seconds a peer must stay in range to complete an assisted revival.
    pub assist_duration_secs: f32,
    /// Interaction range for assisted revival, in world units.
    pub assist_range: f32,
}

impl Default for RevivalConfig {
    fn default() -> Self {
        Self {
            testing_override: false,
            resource_id: "5c052e6986f7746b207bc3c9".to_owned(),
            critical_dedup_window_secs: CRITICAL_DEDUP_WINDOW_SECS,
            revival_cooldown_secs: REVIVAL_COOLDOWN_SECS,
            invulnerability_duration_secs: INVULNERABILITY_DURATION_SECS,
            lethal_damage_threshold: 35.0,
            vital_lethal_threshold: 20.0,
            fallback_fatal_threshold: 70.0,
            critical_damage_clamp: 5.0,
            lethal_health_buffer: 5.0,
            assist_duration_secs: 3.0,
            assist_range: 2.0,
        }
    }
}

impl RevivalConfig {
    /// Parses the config from a TOML document. Unknown keys are rejected so
    /// a typo cannot silently fall back to a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed or
    /// contains unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Assisted-revival abort distance: the interaction range plus a grace
    /// margin so a small shuffle does not cancel the attempt.
    #[must_use]
    pub fn assist_abort_range(&self) -> f32 {
        self.assist_range * 1.5
    }
}
