//! # Error Taxonomy
//!
//! Collaborator failures only. Policy rejects (`NoResource`, `OnCooldown`,
//! `NotCritical`) are outcomes, not errors - see [`crate::RevivalOutcome`].
//! Nothing in this crate is fatal to the host process: every failure degrades
//! to "treat the feature as absent".

use thiserror::Error;

/// Failure reported by the resource oracle when consuming the revival
/// resource.
///
/// Consumption is best-effort and non-transactional with the state
/// transition: a failed consume is logged and the revival still proceeds.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConsumeError {
    /// The player no longer holds the resource.
    #[error("revival resource not found")]
    NotFound,
    /// The inventory store rejected or failed the operation.
    #[error("revival resource consumption failed: {0}")]
    Failed(String),
}

/// Failure loading the configuration surface.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document did not parse or did not match the schema.
    #[error("invalid revival config: {0}")]
    Parse(#[from] toml::de::Error),
}
