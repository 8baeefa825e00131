//! Hikari App - application layer around the playback core
//!
//! Provides what the window shell needs besides the player itself:
//! - the catalog backend client (listing, search, releases, stream lookup)
//! - settings with on-disk persistence
//! - the screen visibility stack
//! - the [`App`] wiring that exposes `open_episode`/`close_player` and
//!   transport notifications outward

pub mod api;
pub mod app;
pub mod screens;
pub mod settings;

pub use api::{
    CatalogBackend, CatalogEntry, DirectoryHandle, EpisodeStreams, HttpBackend, ReleaseDetail,
    PAGE_SIZE,
};
pub use app::{App, SearchOutcome, MIN_SEARCH_LEN};
pub use screens::{Screen, ScreenStack};
pub use settings::{AppSettings, SettingsStore, DEFAULT_API_URL};
