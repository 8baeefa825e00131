//! Hikari Core - Adaptive Playback Controller
//!
//! This crate owns the single video-rendering surface of the application
//! across repeated open/close/switch cycles:
//! - Quality-variant resolution and ordering
//! - Native-vs-software streaming engine selection
//! - Software segmented-streaming engine with in-place fault recovery
//! - Quality menu with live source swaps
//! - Deterministic session teardown
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Hikari Core                             │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │   Variant    │   │   Quality    │   │    Engine    │        │
//! │  │   Resolver   │   │     Menu     │   │   Selector   │        │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘        │
//! │         │                  │                  │                │
//! │         └──────────────────┼──────────────────┘                │
//! │                            │                                   │
//! │                     ┌──────┴──────┐                            │
//! │                     │  Playback   │                            │
//! │                     │   Manager   │                            │
//! │                     └──────┬──────┘                            │
//! │                            │                                   │
//! │  ┌──────────────┐   ┌──────┴──────┐   ┌──────────────┐         │
//! │  │     HUD      │   │  Rendering  │   │   Teardown   │         │
//! │  │  Controller  │   │   Surface   │   │   Manager    │         │
//! │  └──────────────┘   └─────────────┘   └──────────────┘         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod controls;
pub mod engine;
pub mod error;
pub mod hud;
pub mod manifest;
pub mod menu;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod surface;
pub mod teardown;
pub mod types;

pub use controls::ControlAction;
pub use engine::{EngineConfig, EngineErrorKind, EngineEvent, EngineState, StreamEngine};
pub use error::{Error, Result};
pub use hud::{volume_percent, HudController, HudTimer};
pub use menu::{MenuEntry, QualityMenu};
pub use resolver::{StreamDirectory, VariantResolver};
pub use selector::{probe_engine_path, ActiveEngine, EnginePath};
pub use session::{CurrentEpisode, PlaybackManager, PlaybackSession};
pub use surface::{RenderingSurface, SurfaceEvent};
pub use teardown::TeardownManager;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the playback library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Hikari Core initialized");
}
