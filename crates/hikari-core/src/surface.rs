//! Rendering surface abstraction
//!
//! The rendering surface is the on-screen element that decodes and displays
//! video frames. Exactly one surface exists per application run; the
//! playback manager creates its controlling player lazily and reuses it
//! across every open/close/switch cycle. Platform integrations implement
//! [`RenderingSurface`]; the core never talks to a concrete widget.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;
use url::Url;

/// Transport events emitted by the rendering surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Source metadata is loaded; safe to seek and play
    MetadataLoaded,
    Play,
    Pause,
    Ended,
    /// Periodic playback-position report, in seconds
    TimeUpdate(f64),
    /// Volume changed, full scale 0.0..=1.0
    VolumeChanged(f64),
}

/// The single reusable video-rendering surface.
///
/// Two source paths exist: `set_source` hands the surface a raw stream
/// address for native decoding, while `attach_media`/`append_media` let a
/// software streaming engine feed assembled segment data. At most one
/// engine may be attached at any instant; the teardown manager enforces
/// the detach-before-attach ordering.
#[async_trait]
pub trait RenderingSurface: Send + Sync {
    /// Whether the surface can decode the streaming container natively.
    /// Probed once per session by the engine selector.
    fn supports_native_hls(&self) -> bool;

    /// Set a raw stream address as the source (native path)
    async fn set_source(&self, uri: &Url) -> Result<()>;

    /// Clear the current source so nothing keeps downloading in the
    /// background after close
    async fn clear_source(&self) -> Result<()>;

    /// Bind a software streaming engine's output to this surface
    async fn attach_media(&self) -> Result<()>;

    /// Unbind the software streaming engine's output
    async fn detach_media(&self) -> Result<()>;

    /// Append assembled segment data (software path)
    async fn append_media(&self, data: Bytes) -> Result<()>;

    /// Reset the decode pipeline in place, keeping the surface usable
    async fn reset_media(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn is_paused(&self) -> bool;

    /// Current playback position in seconds
    async fn position(&self) -> f64;
    async fn seek(&self, position: f64) -> Result<()>;

    /// Volume on a 0.0..=1.0 scale
    async fn volume(&self) -> f64;
    async fn set_volume(&self, volume: f64) -> Result<()>;

    async fn set_playback_rate(&self, rate: f64) -> Result<()>;

    /// Leave fullscreen presentation if active
    async fn exit_fullscreen(&self) -> Result<()>;

    /// Subscribe to transport events
    fn events(&self) -> broadcast::Receiver<SurfaceEvent>;
}
