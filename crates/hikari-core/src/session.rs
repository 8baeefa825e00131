//! Playback surface manager
//!
//! Owns the single rendering surface and the one live [`PlaybackSession`]
//! across repeated open/close/switch cycles. The player is constructed
//! lazily on the first play request and reused for the rest of the
//! application run; only the session's engine handle is replaced between
//! plays, and only through the teardown manager's sequenced release.
//!
//! All session mutation happens under one lock, so teardown always
//! completes before the next engine attaches, and a second `open_episode`
//! arriving mid-load simply queues behind the first.

use crate::{
    controls::ControlAction,
    engine::EngineConfig,
    hud::{volume_percent, HudController},
    menu::{MenuEntry, QualityMenu},
    resolver::{StreamDirectory, VariantResolver},
    selector::{await_metadata, probe_engine_path, ActiveEngine, EnginePath},
    surface::{RenderingSurface, SurfaceEvent},
    teardown::TeardownManager,
    types::{EpisodeId, PlayerNotice, QualityVariant, SurfaceConfig, SurfaceState},
    Error, Result,
};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of the episode currently bound to the surface
#[derive(Debug, Clone)]
pub struct CurrentEpisode {
    pub episode: EpisodeId,
    pub title: String,
}

/// Mutable state bound to the single reusable rendering surface.
///
/// Exactly one session is live at a time; it is created once and mutated on
/// subsequent plays, never recreated.
pub struct PlaybackSession {
    pub(crate) current: Option<CurrentEpisode>,
    pub(crate) variants: Vec<QualityVariant>,
    pub(crate) active_variant: usize,
    pub(crate) engine: Option<ActiveEngine>,
    pub(crate) menu: Option<QualityMenu>,
    pub(crate) state: SurfaceState,
    pub(crate) last_position: f64,
}

impl PlaybackSession {
    pub(crate) fn new() -> Self {
        Self {
            current: None,
            variants: Vec::new(),
            active_variant: 0,
            engine: None,
            menu: None,
            state: SurfaceState::Uninitialized,
            last_position: 0.0,
        }
    }

    /// Whether an episode is currently bound to the surface
    pub fn is_live(&self) -> bool {
        self.current.is_some() || self.engine.is_some()
    }
}

/// Owner of the rendering surface lifecycle and the live playback session
pub struct PlaybackManager {
    config: SurfaceConfig,
    engine_config: EngineConfig,
    surface: Arc<dyn RenderingSurface>,
    resolver: VariantResolver,
    session: RwLock<PlaybackSession>,
    engine_path: OnceLock<EnginePath>,
    hud: Mutex<HudController>,
    notices_tx: broadcast::Sender<PlayerNotice>,
}

impl PlaybackManager {
    pub fn new(
        surface: Arc<dyn RenderingSurface>,
        directory: Arc<dyn StreamDirectory>,
        config: SurfaceConfig,
    ) -> Self {
        let (notices_tx, _) = broadcast::channel(32);
        let hud = Mutex::new(HudController::new(config.hud_idle_timeout));

        Self {
            config,
            engine_config: EngineConfig::default(),
            surface,
            resolver: VariantResolver::new(directory),
            session: RwLock::new(PlaybackSession::new()),
            engine_path: OnceLock::new(),
            hud,
            notices_tx,
        }
    }

    /// Override the software engine configuration
    pub fn with_engine_config(mut self, engine_config: EngineConfig) -> Self {
        self.engine_config = engine_config;
        self
    }

    /// Subscribe to transport-state notifications
    pub fn notices(&self) -> broadcast::Receiver<PlayerNotice> {
        self.notices_tx.subscribe()
    }

    pub async fn state(&self) -> SurfaceState {
        self.session.read().await.state
    }

    pub async fn current_episode(&self) -> Option<EpisodeId> {
        self.session.read().await.current.as_ref().map(|c| c.episode)
    }

    /// Last position reported by the surface, in seconds
    pub async fn position(&self) -> f64 {
        self.session.read().await.last_position
    }

    pub async fn current_title(&self) -> Option<String> {
        self.session
            .read()
            .await
            .current
            .as_ref()
            .map(|c| c.title.clone())
    }

    /// Decode path chosen for this session, once one has been probed
    pub async fn engine_kind(&self) -> Option<EnginePath> {
        self.session.read().await.engine.as_ref().map(|e| e.path())
    }

    /// Identity of the attached software engine, if any
    pub async fn engine_instance(&self) -> Option<Uuid> {
        self.session
            .read()
            .await
            .engine
            .as_ref()
            .and_then(|e| e.instance_id())
    }

    /// Snapshot of the mounted quality menu's entries
    pub async fn menu_entries(&self) -> Vec<MenuEntry> {
        self.session
            .read()
            .await
            .menu
            .as_ref()
            .map(|m| m.entries().to_vec())
            .unwrap_or_default()
    }

    pub async fn active_quality_label(&self) -> Option<String> {
        let session = self.session.read().await;
        session
            .variants
            .get(session.active_variant)
            .map(|v| v.menu_label())
    }

    /// Entry point into playback: resolve the episode's variants, release
    /// any previous engine, mount a fresh quality menu, and start the
    /// default (auto) variant on the selected decode path.
    pub async fn open_episode(&self, episode: EpisodeId, title: &str) -> Result<()> {
        info!(%episode, title, "opening episode");

        // Resolve before touching the surface: a resolution failure must
        // leave the previous screen and session untouched.
        let variants = self.resolver.resolve(episode).await?;

        let mut session = self.session.write().await;
        self.ensure_player(&mut session)?;

        // Previous engine must be fully released before a new attach
        TeardownManager::release_engine(&mut session).await;

        // Replace any mounted menu; at most one exists at a time
        if session.menu.replace(QualityMenu::render(&variants, 0)).is_some() {
            debug!("previous quality menu replaced");
        }

        let path = *self
            .engine_path
            .get_or_init(|| probe_engine_path(self.surface.as_ref()));

        let engine =
            ActiveEngine::create(path, self.surface.clone(), self.engine_config.clone()).await?;

        if let Err(e) = engine
            .load_source(&variants[0].uri, self.config.readiness_timeout)
            .await
        {
            // Never leave a half-attached engine behind
            if let Err(detach_err) = engine.detach().await {
                warn!(error = %detach_err, "detach after failed load");
            }
            engine.release().await;
            session.menu = None;
            return Err(e);
        }

        session.engine = Some(engine);
        session.current = Some(CurrentEpisode {
            episode,
            title: title.to_string(),
        });
        session.variants = variants;
        session.active_variant = 0;
        session.last_position = 0.0;

        if self.config.autoplay {
            self.surface.play().await?;
        }

        let target = if self.config.autoplay {
            SurfaceState::Playing
        } else {
            SurfaceState::Ready
        };
        self.transition(&mut session, target)?;

        if self.config.autoplay {
            self.hud.lock().unwrap().on_play(Instant::now());
        }
        Ok(())
    }

    /// Live quality switch preserving playback position and pause state.
    ///
    /// The source is swapped into the existing engine instance; no engine
    /// rebuild, no surface flicker.
    pub async fn select_quality(&self, index: usize) -> Result<()> {
        let mut session = self.session.write().await;

        let entry = {
            let menu = session.menu.as_ref().ok_or(Error::NoActiveSession)?;
            menu.entry(index)
                .cloned()
                .ok_or(Error::InvalidSelection {
                    index,
                    len: menu.len(),
                })?
        };

        // 1. Capture transport state before the swap
        let position = self.surface.position().await;
        let was_paused = self.surface.is_paused().await;

        // 2. Swap in place on the live engine
        {
            let engine = session.engine.as_ref().ok_or(Error::NoActiveSession)?;
            let events = self.surface.events();
            engine.swap_source(&entry.uri).await?;

            // 3. Restore position, resume only if we were playing
            await_metadata(events, self.config.readiness_timeout).await?;
        }
        self.surface.seek(position).await?;
        if !was_paused {
            self.surface.play().await?;
        }

        // 4. Exactly the clicked entry is selected afterwards
        if let Some(menu) = session.menu.as_mut() {
            menu.select(index);
        }
        session.active_variant = index;

        info!(
            quality = %entry.label,
            position,
            resumed = !was_paused,
            "quality switched"
        );
        Ok(())
    }

    /// Explicit close. Idempotent: closing an already-closed player does
    /// nothing and releases nothing twice.
    pub async fn close(&self) {
        let mut session = self.session.write().await;
        if !session.is_live() {
            debug!("close requested on idle player");
            return;
        }

        TeardownManager::close(&mut session, self.surface.as_ref()).await;

        if let Err(e) = self.transition(&mut session, SurfaceState::Ready) {
            warn!(error = %e, "close state transition rejected");
        }
        self.hud.lock().unwrap().on_pause();
        self.notify(PlayerNotice::Closed);
    }

    /// Dispatch a transport event from the rendering surface
    pub async fn handle_surface_event(&self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Play => {
                let mut session = self.session.write().await;
                if self.transition(&mut session, SurfaceState::Playing).is_ok() {
                    self.hud.lock().unwrap().on_play(Instant::now());
                    self.notify(PlayerNotice::Playing);
                }
            }
            SurfaceEvent::Pause => {
                let mut session = self.session.write().await;
                if self.transition(&mut session, SurfaceState::Paused).is_ok() {
                    self.hud.lock().unwrap().on_pause();
                    self.notify(PlayerNotice::Paused);
                }
            }
            SurfaceEvent::Ended => {
                let mut session = self.session.write().await;
                let episode = session.current.as_ref().map(|c| c.episode);
                if self.transition(&mut session, SurfaceState::Ended).is_ok() {
                    // Whether to advance or exit is the caller's policy
                    if let Some(episode) = episode {
                        self.notify(PlayerNotice::Ended { episode });
                    }
                }
            }
            SurfaceEvent::TimeUpdate(position) => {
                self.session.write().await.last_position = position;
                self.hud.lock().unwrap().tick(Instant::now());
            }
            SurfaceEvent::VolumeChanged(volume) => {
                self.notify(PlayerNotice::VolumeChanged {
                    percent: volume_percent(volume),
                });
            }
            SurfaceEvent::MetadataLoaded => {
                // Awaited inline where a load or swap is in flight
            }
        }
    }

    /// Pump surface events into the manager until the surface goes away
    pub fn spawn_event_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut events = self.surface.events();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => manager.handle_surface_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "surface event pump lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Apply a keyboard/remote control action
    pub async fn apply_control(&self, action: ControlAction) -> Result<()> {
        match action {
            ControlAction::PlayPause => {
                if self.surface.is_paused().await {
                    self.surface.play().await
                } else {
                    self.surface.pause().await
                }
            }
            ControlAction::SeekForward => {
                let position = self.surface.position().await;
                self.surface.seek(position + self.config.seek_step).await
            }
            ControlAction::SeekBackward => {
                let position = self.surface.position().await;
                self.surface
                    .seek((position - self.config.seek_step).max(0.0))
                    .await
            }
            ControlAction::VolumeUp => {
                let volume = self.surface.volume().await;
                self.surface
                    .set_volume((volume + self.config.volume_step).min(1.0))
                    .await
            }
            ControlAction::VolumeDown => {
                let volume = self.surface.volume().await;
                self.surface
                    .set_volume((volume - self.config.volume_step).max(0.0))
                    .await
            }
        }
    }

    /// Set the playback rate, restricted to the configured multipliers
    pub async fn set_playback_rate(&self, rate: f64) -> Result<()> {
        let allowed = self
            .config
            .playback_rates
            .iter()
            .any(|r| (r - rate).abs() < f64::EPSILON);
        if !allowed {
            return Err(Error::Internal(format!(
                "playback rate {rate} is not in the configured set"
            )));
        }
        self.surface.set_playback_rate(rate).await
    }

    /// Pointer moved over the player: show the HUD and rearm its timer
    pub fn pointer_moved(&self) {
        self.hud.lock().unwrap().on_pointer_moved(Instant::now());
    }

    /// Advance the HUD idle timer
    pub fn hud_tick(&self) {
        self.hud.lock().unwrap().tick(Instant::now());
    }

    pub fn hud_visible(&self) -> bool {
        self.hud.lock().unwrap().visible()
    }

    /// One-time player construction on the first play request
    fn ensure_player(&self, session: &mut PlaybackSession) -> Result<()> {
        if session.state != SurfaceState::Uninitialized {
            return Ok(());
        }
        info!(
            rates = ?self.config.playback_rates,
            fluid = self.config.fluid,
            seek_step = self.config.seek_step,
            "constructing player"
        );
        self.transition(session, SurfaceState::Ready)
    }

    fn transition(&self, session: &mut PlaybackSession, to: SurfaceState) -> Result<()> {
        let from = session.state;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        session.state = to;
        debug!(%from, %to, "surface state transition");
        Ok(())
    }

    fn notify(&self, notice: PlayerNotice) {
        let _ = self.notices_tx.send(notice);
    }
}
