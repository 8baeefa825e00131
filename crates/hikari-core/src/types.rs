//! Core types for Hikari playback

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Unique identifier for an episode, as issued by the catalog backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub Uuid);

impl EpisodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a catalog release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseId(pub u64);

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known quality tiers, highest first.
///
/// The derived ordering is used for ranking: `FullHd` sorts before `Hd`,
/// which sorts before `Sd`. Tiers the backend does not provide are simply
/// absent from a variant set, never padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    FullHd,
    Hd,
    Sd,
}

impl QualityTier {
    /// Human-readable tier label used in menus
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::FullHd => "1080p",
            QualityTier::Hd => "720p",
            QualityTier::Sd => "480p",
        }
    }

    /// Parse a backend-supplied label into a known tier
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "1080p" | "1080" => Some(QualityTier::FullHd),
            "720p" | "720" => Some(QualityTier::Hd),
            "480p" | "480" => Some(QualityTier::Sd),
            _ => None,
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One selectable stream encoding tier for an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityVariant {
    /// Quality tier of this variant
    pub tier: QualityTier,
    /// Manifest address for this tier
    pub uri: Url,
    /// Whether this is the default/"auto" entry (always the first of a set)
    pub is_auto: bool,
}

impl QualityVariant {
    /// Label shown in the quality menu; the auto entry advertises the tier
    /// it resolves to, e.g. "Auto (1080p)".
    pub fn menu_label(&self) -> String {
        if self.is_auto {
            format!("Auto ({})", self.tier.label())
        } else {
            self.tier.label().to_string()
        }
    }
}

/// Raw quality-variant record as returned by the stream directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVariant {
    /// Quality label, e.g. "1080p"
    pub label: String,
    /// Opaque stream address (manifest URI)
    pub address: String,
}

/// Reference to one episode within a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub id: EpisodeId,
    pub ordinal: u32,
}

/// A playable title with its episode list.
///
/// Built when a detail view opens and discarded when it closes; never
/// mutated in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayableItem {
    pub id: ReleaseId,
    pub title: String,
    pub episodes: Vec<EpisodeRef>,
}

impl PlayableItem {
    /// Episode that follows `current` in ordinal sequence, if any
    pub fn next_episode(&self, current: EpisodeId) -> Option<EpisodeRef> {
        let idx = self.episodes.iter().position(|e| e.id == current)?;
        self.episodes.get(idx + 1).copied()
    }
}

/// Playback surface state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceState {
    /// No player constructed yet; first play request initializes it
    Uninitialized,
    /// Player constructed and idle
    Ready,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Active episode's stream ended
    Ended,
}

impl SurfaceState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SurfaceState) -> bool {
        use SurfaceState::*;
        matches!(
            (self, target),
            (Uninitialized, Ready)
                | (Ready, Playing)
                | (Ready, Paused)
                | (Playing, Paused)
                | (Playing, Ended)
                | (Playing, Ready)
                | (Paused, Playing)
                | (Paused, Ready)
                | (Ended, Playing)
                | (Ended, Ready)
        )
    }
}

impl std::fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceState::Uninitialized => write!(f, "uninitialized"),
            SurfaceState::Ready => write!(f, "ready"),
            SurfaceState::Playing => write!(f, "playing"),
            SurfaceState::Paused => write!(f, "paused"),
            SurfaceState::Ended => write!(f, "ended"),
        }
    }
}

/// Fixed configuration applied when the player is constructed
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Start playback automatically once the source is ready
    pub autoplay: bool,
    /// Responsive sizing of the rendering surface
    pub fluid: bool,
    /// Allowed playback-rate multipliers
    pub playback_rates: Vec<f64>,
    /// Keyboard seek step in seconds
    pub seek_step: f64,
    /// Keyboard volume step (fraction of full scale)
    pub volume_step: f64,
    /// HUD idle interval before auto-hide while playing
    pub hud_idle_timeout: Duration,
    /// How long to wait for a readiness signal before giving up
    pub readiness_timeout: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            fluid: true,
            playback_rates: vec![0.5, 1.0, 1.25, 1.5, 2.0],
            seek_step: 10.0,
            volume_step: 0.05,
            hud_idle_timeout: Duration::from_secs(3),
            readiness_timeout: Duration::from_secs(10),
        }
    }
}

/// Transport-state notification emitted by the playback manager for HUD
/// and navigation consumers
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotice {
    Playing,
    Paused,
    Ended { episode: EpisodeId },
    VolumeChanged { percent: u8 },
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_is_highest_first() {
        let mut tiers = vec![QualityTier::Sd, QualityTier::FullHd, QualityTier::Hd];
        tiers.sort();
        assert_eq!(
            tiers,
            vec![QualityTier::FullHd, QualityTier::Hd, QualityTier::Sd]
        );
    }

    #[test]
    fn tier_label_roundtrip() {
        for tier in [QualityTier::FullHd, QualityTier::Hd, QualityTier::Sd] {
            assert_eq!(QualityTier::parse_label(tier.label()), Some(tier));
        }
        assert_eq!(QualityTier::parse_label("144p"), None);
    }

    #[test]
    fn auto_variant_menu_label() {
        let uri = Url::parse("https://cdn.example.com/ep1/1080/index.m3u8").unwrap();
        let auto = QualityVariant {
            tier: QualityTier::FullHd,
            uri: uri.clone(),
            is_auto: true,
        };
        let plain = QualityVariant {
            tier: QualityTier::FullHd,
            uri,
            is_auto: false,
        };
        assert_eq!(auto.menu_label(), "Auto (1080p)");
        assert_eq!(plain.menu_label(), "1080p");
    }

    #[test]
    fn surface_state_transitions() {
        assert!(SurfaceState::Uninitialized.can_transition_to(SurfaceState::Ready));
        assert!(SurfaceState::Ready.can_transition_to(SurfaceState::Playing));
        assert!(SurfaceState::Playing.can_transition_to(SurfaceState::Paused));
        assert!(SurfaceState::Paused.can_transition_to(SurfaceState::Playing));
        assert!(SurfaceState::Playing.can_transition_to(SurfaceState::Ended));

        assert!(!SurfaceState::Uninitialized.can_transition_to(SurfaceState::Playing));
        assert!(!SurfaceState::Ended.can_transition_to(SurfaceState::Paused));
    }

    #[test]
    fn next_episode_in_sequence() {
        let e1 = EpisodeRef {
            id: EpisodeId::new(),
            ordinal: 1,
        };
        let e2 = EpisodeRef {
            id: EpisodeId::new(),
            ordinal: 2,
        };
        let item = PlayableItem {
            id: ReleaseId(9000),
            title: "Example Show".into(),
            episodes: vec![e1, e2],
        };

        assert_eq!(item.next_episode(e1.id), Some(e2));
        assert_eq!(item.next_episode(e2.id), None);
        assert_eq!(item.next_episode(EpisodeId::new()), None);
    }
}
