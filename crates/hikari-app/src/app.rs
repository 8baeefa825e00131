//! Application wiring
//!
//! Connects the catalog backend, the settings store, the screen stack and
//! the playback manager, and exposes the surface the rest of the shell
//! drives: catalog paging, search, detail views, `open_episode` and
//! `close_player`.

use crate::{
    api::{CatalogBackend, CatalogEntry, DirectoryHandle, ReleaseDetail},
    screens::{Screen, ScreenStack},
    settings::{AppSettings, SettingsStore},
};
use hikari_core::{
    EpisodeId, PlaybackManager, PlayerNotice, ReleaseId, RenderingSurface, Result, SurfaceConfig,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Queries shorter than this are ignored instead of hitting the backend
pub const MIN_SEARCH_LEN: usize = 3;

/// Infinite-scroll pagination state for the catalog screen
#[derive(Debug, Default)]
struct CatalogPager {
    next_page: u32,
    exhausted: bool,
    fetching: bool,
}

/// Outcome of a search request
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Query under the minimum length; nothing was fetched
    TooShort,
    /// Query cleared; the caller should show the catalog again
    Cleared,
    Results(Vec<CatalogEntry>),
}

/// Top-level application state
pub struct App {
    backend: Arc<dyn CatalogBackend>,
    settings: Arc<SettingsStore>,
    player: Arc<PlaybackManager>,
    screens: Mutex<ScreenStack>,
    pager: tokio::sync::Mutex<CatalogPager>,
}

impl App {
    pub fn new(
        surface: Arc<dyn RenderingSurface>,
        backend: Arc<dyn CatalogBackend>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let directory = Arc::new(DirectoryHandle(backend.clone()));
        let player = Arc::new(PlaybackManager::new(
            surface,
            directory,
            SurfaceConfig::default(),
        ));

        Self {
            backend,
            settings,
            player,
            screens: Mutex::new(ScreenStack::new()),
            pager: tokio::sync::Mutex::new(CatalogPager::default()),
        }
    }

    /// The playback manager, for transport controls and HUD queries
    pub fn player(&self) -> &Arc<PlaybackManager> {
        &self.player
    }

    /// Transport-state notifications for HUD and navigation consumers
    pub fn notices(&self) -> broadcast::Receiver<PlayerNotice> {
        self.player.notices()
    }

    pub fn active_screen(&self) -> Screen {
        self.screens.lock().unwrap().active()
    }

    pub fn show_browse(&self, screen: Screen) {
        self.screens.lock().unwrap().show_browse(screen);
    }

    pub fn back_from_details(&self) {
        self.screens.lock().unwrap().back_from_details();
    }

    /// Entry point into playback. The player overlay is shown only once
    /// the episode actually starts; a resolution failure leaves the
    /// current screen visible and surfaces the error inline.
    #[instrument(skip(self, title))]
    pub async fn open_episode(&self, episode: EpisodeId, title: &str) -> Result<()> {
        self.player.open_episode(episode, title).await?;
        self.screens.lock().unwrap().enter_player();
        Ok(())
    }

    /// Close the player and restore whichever screen it covered. Always
    /// restores the screen, even if parts of the teardown failed.
    pub async fn close_player(&self) {
        self.player.close().await;
        self.screens.lock().unwrap().close_player();
        info!("player closed");
    }

    /// Open a release detail view
    pub async fn open_details(&self, id: ReleaseId) -> Result<ReleaseDetail> {
        let detail = self.backend.full_release(id).await?;
        self.screens.lock().unwrap().show_details();
        Ok(detail)
    }

    /// Latest releases for the landing screen
    pub async fn latest(&self) -> Result<Vec<CatalogEntry>> {
        self.backend.latest().await
    }

    /// Fetch the next catalog page. Returns an empty list once the catalog
    /// is exhausted or while a fetch is already running.
    pub async fn next_catalog_page(&self) -> Result<Vec<CatalogEntry>> {
        let page = {
            let mut pager = self.pager.lock().await;
            if pager.exhausted || pager.fetching {
                return Ok(Vec::new());
            }
            pager.fetching = true;
            pager.next_page
        };

        let result = self.backend.catalog_page(page).await;

        let mut pager = self.pager.lock().await;
        pager.fetching = false;
        match result {
            Ok(entries) => {
                if entries.is_empty() {
                    info!(page, "catalog exhausted");
                    pager.exhausted = true;
                } else {
                    pager.next_page += 1;
                }
                Ok(entries)
            }
            Err(e) => {
                warn!(page, error = %e, "catalog page fetch failed");
                Err(e)
            }
        }
    }

    /// Run a catalog search for `query`
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Cleared);
        }
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(SearchOutcome::TooShort);
        }
        Ok(SearchOutcome::Results(self.backend.search(query).await?))
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.get()
    }

    pub fn save_settings(&self, settings: AppSettings) -> anyhow::Result<()> {
        self.settings.save(settings)
    }
}
