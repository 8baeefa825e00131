//! Streaming engine selection
//!
//! Decides, once per session, whether the rendering surface can decode the
//! streaming container natively. The decision is carried in the playback
//! session as a two-variant union: the native path hands stream addresses
//! straight to the surface, the software path owns a [`StreamEngine`].
//! Both variants expose the same load/swap/release capability set.

use crate::{
    engine::{spawn_recovery_watch, EngineConfig, EngineEvent, StreamEngine},
    surface::{RenderingSurface, SurfaceEvent},
    Error, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Which decode path the current environment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePath {
    /// The surface decodes the streaming container itself
    Native,
    /// A software streaming engine assembles segments for the surface
    Software,
}

/// Probe the surface's native capability. Called once per session; callers
/// cache the answer.
pub fn probe_engine_path(surface: &dyn RenderingSurface) -> EnginePath {
    if surface.supports_native_hls() {
        info!("native streaming decode available");
        EnginePath::Native
    } else {
        info!("native decode unavailable, using software streaming engine");
        EnginePath::Software
    }
}

/// The active decode path for one playback session.
///
/// Exactly one `ActiveEngine` may be bound to the rendering surface at any
/// instant; the teardown manager releases the previous one before a new one
/// is constructed.
pub enum ActiveEngine {
    Native {
        surface: Arc<dyn RenderingSurface>,
    },
    Software {
        engine: Arc<StreamEngine>,
    },
}

impl ActiveEngine {
    /// Construct the engine for the chosen path and bind it to the surface
    pub async fn create(
        path: EnginePath,
        surface: Arc<dyn RenderingSurface>,
        config: EngineConfig,
    ) -> Result<Self> {
        match path {
            EnginePath::Native => Ok(ActiveEngine::Native { surface }),
            EnginePath::Software => {
                let engine = Arc::new(StreamEngine::new(config));
                spawn_recovery_watch(&engine);
                engine.attach(surface).await?;
                Ok(ActiveEngine::Software { engine })
            }
        }
    }

    /// Which path this engine implements
    pub fn path(&self) -> EnginePath {
        match self {
            ActiveEngine::Native { .. } => EnginePath::Native,
            ActiveEngine::Software { .. } => EnginePath::Software,
        }
    }

    /// Identity of the software engine instance, if one exists
    pub fn instance_id(&self) -> Option<Uuid> {
        match self {
            ActiveEngine::Native { .. } => None,
            ActiveEngine::Software { engine } => Some(engine.id()),
        }
    }

    /// Load the initial source and wait for the matching readiness signal
    /// ("metadata loaded" on the native path, "manifest parsed" on the
    /// software path) so the caller may issue play.
    pub async fn load_source(&self, uri: &Url, readiness_timeout: Duration) -> Result<()> {
        match self {
            ActiveEngine::Native { surface } => {
                let events = surface.events();
                surface.set_source(uri).await?;
                await_metadata(events, readiness_timeout).await
            }
            ActiveEngine::Software { engine } => {
                // load_source returns only after the manifest is parsed
                let mut events = engine.events();
                engine.load_source(uri).await?;
                // Drain the signal so lagging subscribers cannot confuse a
                // later swap
                let _ = events.try_recv();
                Ok(())
            }
        }
    }

    /// Live source swap: reuse the existing engine/surface binding, no
    /// rebuild, no surface flicker. The caller is responsible for awaiting
    /// the next metadata signal and restoring position/pause state.
    pub async fn swap_source(&self, uri: &Url) -> Result<()> {
        match self {
            ActiveEngine::Native { surface } => surface.set_source(uri).await,
            ActiveEngine::Software { engine } => {
                debug!(engine = %engine.id(), "in-place source swap");
                engine.load_source(uri).await
            }
        }
    }

    /// Step one of teardown: unbind from the rendering surface
    pub async fn detach(&self) -> Result<()> {
        match self {
            ActiveEngine::Native { .. } => Ok(()),
            ActiveEngine::Software { engine } => engine.detach().await,
        }
    }

    /// Step two of teardown: release engine resources
    pub async fn release(&self) {
        match self {
            ActiveEngine::Native { .. } => {}
            ActiveEngine::Software { engine } => engine.destroy().await,
        }
    }

    /// Subscribe to software-engine events; empty channel on the native path
    pub fn engine_events(&self) -> Option<broadcast::Receiver<EngineEvent>> {
        match self {
            ActiveEngine::Native { .. } => None,
            ActiveEngine::Software { engine } => Some(engine.events()),
        }
    }
}

/// Wait on an already-subscribed receiver for the metadata-loaded signal
pub(crate) async fn await_metadata(
    mut events: broadcast::Receiver<SurfaceEvent>,
    timeout: Duration,
) -> Result<()> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(SurfaceEvent::MetadataLoaded) => return Ok(()),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::Internal("surface event stream closed".into()))
                }
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| Error::ReadinessTimeout)?
}
