//! Session teardown
//!
//! Releases a session's streaming engine deterministically: detach from the
//! rendering surface, then destroy the engine, then clear the session
//! handle, strictly in that order, on quality switch, episode switch and
//! explicit close alike. Only after the sequence completes may a new engine
//! be attached. Close additionally quiesces the surface; every step is
//! best-effort so a partial failure never blocks returning control.

use crate::{
    session::PlaybackSession,
    surface::RenderingSurface,
};
use tracing::{debug, warn};

/// Sequenced engine release and close handling
pub struct TeardownManager;

impl TeardownManager {
    /// Detach and destroy the session's engine, leaving `engine = None`.
    ///
    /// Safe to call when no engine is attached; does nothing in that case.
    pub async fn release_engine(session: &mut PlaybackSession) {
        if let Some(engine) = &session.engine {
            if let Err(e) = engine.detach().await {
                warn!(error = %e, "engine detach failed, continuing teardown");
            }
            engine.release().await;
            debug!("streaming engine released");
        }
        session.engine = None;
    }

    /// Full close: release the engine, quiesce the surface, and drop the
    /// session's episode state. Each step runs even if an earlier one
    /// failed.
    pub async fn close(session: &mut PlaybackSession, surface: &dyn RenderingSurface) {
        Self::release_engine(session).await;

        if let Err(e) = surface.pause().await {
            warn!(error = %e, "pause during close failed");
        }
        // Clear the source so nothing keeps downloading in the background
        if let Err(e) = surface.clear_source().await {
            warn!(error = %e, "source clear during close failed");
        }
        if let Err(e) = surface.exit_fullscreen().await {
            warn!(error = %e, "fullscreen exit during close failed");
        }

        if session.menu.take().is_some() {
            debug!("quality menu unmounted");
        }
        session.current = None;
        session.variants.clear();
        session.active_variant = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::selector::{ActiveEngine, EnginePath};
    use crate::session::PlaybackSession;
    use crate::surface::fake::FakeSurface;
    use std::sync::Arc;

    async fn session_with_software_engine(
        surface: &Arc<FakeSurface>,
    ) -> PlaybackSession {
        let mut session = PlaybackSession::new();
        let engine = ActiveEngine::create(
            EnginePath::Software,
            surface.clone(),
            EngineConfig {
                enable_worker: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        session.engine = Some(engine);
        session
    }

    #[tokio::test]
    async fn release_detaches_before_destroy_and_clears_handle() {
        let surface = Arc::new(FakeSurface::new(false));
        let mut session = session_with_software_engine(&surface).await;

        TeardownManager::release_engine(&mut session).await;

        assert!(session.engine.is_none());
        // The surface saw attach then detach, nothing after
        assert_eq!(surface.log(), vec!["attach_media", "detach_media"]);
    }

    #[tokio::test]
    async fn release_without_engine_is_a_no_op() {
        let mut session = PlaybackSession::new();
        TeardownManager::release_engine(&mut session).await;
        assert!(session.engine.is_none());
    }

    #[tokio::test]
    async fn close_quiesces_surface_and_drops_session_state() {
        let surface = Arc::new(FakeSurface::new(false));
        let mut session = session_with_software_engine(&surface).await;

        TeardownManager::close(&mut session, surface.as_ref()).await;

        assert!(session.engine.is_none());
        assert!(session.menu.is_none());
        assert!(session.current.is_none());

        let log = surface.log();
        let detach_at = log.iter().position(|c| *c == "detach_media").unwrap();
        let pause_at = log.iter().position(|c| *c == "pause").unwrap();
        let clear_at = log.iter().position(|c| *c == "clear_source").unwrap();
        let fs_at = log.iter().position(|c| *c == "exit_fullscreen").unwrap();
        assert!(detach_at < pause_at && pause_at < clear_at && clear_at < fs_at);
        assert!(!surface.state.lock().unwrap().fullscreen);
    }
}
