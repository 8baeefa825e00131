//! Error types for Hikari Core

use crate::types::EpisodeId;
use thiserror::Error;

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Playback error types
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors
    #[error("no stream variants available for episode {episode}")]
    NoVariants { episode: EpisodeId },

    // Collaborator errors
    #[error("backend request failed: {0}")]
    Backend(String),

    // Manifest errors
    #[error("failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    // Engine errors
    #[error("fatal network error in streaming engine: {0}")]
    FatalNetwork(String),

    #[error("fatal media error in streaming engine: {0}")]
    FatalMedia(String),

    #[error("engine recovery exhausted after {attempts} attempts")]
    RecoveryExhausted { attempts: u32 },

    #[error("streaming engine already destroyed")]
    EngineDestroyed,

    // Playback errors
    #[error("invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("no playback session is live")]
    NoActiveSession,

    #[error("quality selection {index} out of range (menu has {len} entries)")]
    InvalidSelection { index: usize, len: usize },

    #[error("timed out waiting for surface readiness signal")]
    ReadinessTimeout,

    // Network errors
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the engine is expected to heal this error in place,
    /// without being rebuilt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FatalNetwork(_)
                | Error::FatalMedia(_)
                | Error::ManifestFetch(_)
                | Error::Network(_)
        )
    }

    /// Returns true if this error should be surfaced to the user as an
    /// inline message in place of the player.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::NoVariants { .. } | Error::RecoveryExhausted { .. }
        )
    }
}
