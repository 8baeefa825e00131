//! Software segmented-streaming engine
//!
//! Used when the rendering surface cannot decode the streaming container
//! natively. The engine fetches the manifest for one quality tier, then
//! feeds assembled segment data to the surface from a background worker.
//! A quality change reloads the new source into the SAME engine instance:
//! the worker is stopped and the decode buffers flushed before the new
//! manifest is applied, so streaming state is rebuilt without the engine
//! object ever being replaced.
//!
//! Failure semantics:
//! - fatal network-class faults reload the current manifest in place
//! - fatal media-class faults recover the decode pipeline in place
//! - non-fatal faults are ignored
//! Recovery is bounded; see [`EngineConfig::max_recovery_attempts`].

use crate::{
    manifest::{parse_manifest, ParsedManifest, StreamManifest},
    surface::RenderingSurface,
    Error, Result,
};
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Streaming engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run segment fetching on a background worker task
    pub enable_worker: bool,
    /// Fetch eagerly instead of pacing to segment duration
    pub low_latency_mode: bool,
    /// Automatic in-place recoveries allowed per loaded source
    pub max_recovery_attempts: u32,
    /// Timeout for manifest and segment requests
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: true,
            max_recovery_attempts: 3,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, no source loaded
    Idle,
    /// Fetching/parsing a manifest
    Loading,
    /// Manifest applied; worker feeding the surface
    Ready,
    /// Released; must never touch the surface again
    Destroyed,
}

/// Fatal error classes the engine distinguishes for recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Network,
    Media,
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Manifest fetched and parsed; safe to issue play
    ManifestParsed { segments: usize },
    /// A fatal fault was observed and recovery will be attempted
    FatalError { kind: EngineErrorKind, detail: String },
    /// An in-place recovery succeeded
    Recovered { kind: EngineErrorKind },
    /// Recovery budget for the current source is spent
    RecoveryExhausted { attempts: u32 },
    /// The engine was destroyed
    Destroyed,
}

/// Software streaming engine bound to at most one rendering surface
pub struct StreamEngine {
    id: Uuid,
    config: EngineConfig,
    client: Client,
    surface: RwLock<Option<Arc<dyn RenderingSurface>>>,
    state: RwLock<EngineState>,
    source: RwLock<Option<Url>>,
    manifest: RwLock<Option<StreamManifest>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    load_count: AtomicU32,
    recovery_attempts: AtomicU32,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl StreamEngine {
    pub fn new(config: EngineConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        let (events_tx, _) = broadcast::channel(32);

        Self {
            id: Uuid::new_v4(),
            config,
            client,
            surface: RwLock::new(None),
            state: RwLock::new(EngineState::Idle),
            source: RwLock::new(None),
            manifest: RwLock::new(None),
            worker: Mutex::new(None),
            load_count: AtomicU32::new(0),
            recovery_attempts: AtomicU32::new(0),
            events_tx,
        }
    }

    /// Stable identity of this engine instance; unchanged across source
    /// swaps and recoveries
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// How many times a source has been applied to this instance
    pub fn load_count(&self) -> u32 {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Subscribe to engine events
    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Bind this engine's output to a rendering surface
    pub async fn attach(&self, surface: Arc<dyn RenderingSurface>) -> Result<()> {
        self.ensure_alive().await?;
        surface.attach_media().await?;
        *self.surface.write().await = Some(surface);

        // Supports the load-then-attach call order as well
        if self.manifest.read().await.is_some() {
            self.spawn_worker().await;
        }
        Ok(())
    }

    /// Load a stream address into this engine.
    ///
    /// On an engine that already carries a source this is the live-swap
    /// path: the worker stops and buffers flush before the new manifest is
    /// applied, and the instance is reused as-is.
    pub async fn load_source(&self, uri: &Url) -> Result<()> {
        self.ensure_alive().await?;
        self.stop_streaming().await;

        *self.source.write().await = Some(uri.clone());
        self.recovery_attempts.store(0, Ordering::SeqCst);

        let manifest = self.fetch_manifest(uri).await?;
        self.apply_manifest(manifest).await
    }

    /// Reload the current manifest without rebuilding the engine
    /// (network-class recovery)
    pub async fn start_load(&self) -> Result<()> {
        self.ensure_alive().await?;
        let uri = self
            .source
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Internal("start_load with no source".into()))?;

        self.stop_streaming().await;
        let manifest = self.fetch_manifest(&uri).await?;
        self.apply_manifest(manifest).await
    }

    /// Recover the decode pipeline in place (media-class recovery)
    pub async fn recover_media_error(&self) -> Result<()> {
        self.ensure_alive().await?;
        self.stop_worker().await;

        if let Some(surface) = self.surface.read().await.clone() {
            surface.reset_media().await?;
        }
        self.spawn_worker().await;
        Ok(())
    }

    /// Dispatch a fatal fault to the matching in-place recovery, bounded by
    /// the configured attempt budget
    pub async fn handle_fatal(&self, kind: EngineErrorKind) -> Result<()> {
        if *self.state.read().await == EngineState::Destroyed {
            return Ok(());
        }

        let attempts = self.recovery_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempts > self.config.max_recovery_attempts {
            warn!(?kind, attempts, "engine recovery budget spent");
            let _ = self
                .events_tx
                .send(EngineEvent::RecoveryExhausted { attempts });
            return Err(Error::RecoveryExhausted { attempts });
        }

        info!(?kind, attempt = attempts, "recovering streaming engine in place");
        match kind {
            EngineErrorKind::Network => self.start_load().await?,
            EngineErrorKind::Media => self.recover_media_error().await?,
        }

        let _ = self.events_tx.send(EngineEvent::Recovered { kind });
        Ok(())
    }

    /// Unbind from the rendering surface, stopping the worker first
    pub async fn detach(&self) -> Result<()> {
        self.stop_worker().await;
        if let Some(surface) = self.surface.write().await.take() {
            surface.detach_media().await?;
        }
        Ok(())
    }

    /// Release the engine. Detaches if still attached; idempotent.
    pub async fn destroy(&self) {
        {
            let mut state = self.state.write().await;
            if *state == EngineState::Destroyed {
                return;
            }
            *state = EngineState::Destroyed;
        }

        if let Err(e) = self.detach().await {
            warn!(error = %e, "detach during engine destroy failed");
        }
        *self.manifest.write().await = None;
        *self.source.write().await = None;

        debug!(engine = %self.id, "streaming engine destroyed");
        let _ = self.events_tx.send(EngineEvent::Destroyed);
    }

    async fn ensure_alive(&self) -> Result<()> {
        if *self.state.read().await == EngineState::Destroyed {
            return Err(Error::EngineDestroyed);
        }
        Ok(())
    }

    /// Fetch and parse the manifest at `uri`, following one level of
    /// multivariant indirection
    async fn fetch_manifest(&self, uri: &Url) -> Result<StreamManifest> {
        *self.state.write().await = EngineState::Loading;

        let content = self.fetch_text(uri).await?;
        match parse_manifest(&content, uri)? {
            ParsedManifest::Media(manifest) => Ok(manifest),
            ParsedManifest::Master(variants) => {
                let first = &variants[0];
                debug!(variant = %first, "following multivariant playlist");
                let content = self.fetch_text(first).await?;
                match parse_manifest(&content, first)? {
                    ParsedManifest::Media(manifest) => Ok(manifest),
                    ParsedManifest::Master(_) => Err(Error::ManifestParse(
                        "nested multivariant playlists are not supported".into(),
                    )),
                }
            }
        }
    }

    async fn fetch_text(&self, uri: &Url) -> Result<String> {
        let response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(|e| Error::ManifestFetch(format!("{uri}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ManifestFetch(format!(
                "{uri}: status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::ManifestFetch(format!("{uri}: {e}")))
    }

    /// Store a parsed manifest and restart segment feeding
    pub(crate) async fn apply_manifest(&self, manifest: StreamManifest) -> Result<()> {
        self.ensure_alive().await?;

        let segments = manifest.segments.len();
        *self.manifest.write().await = Some(manifest);
        *self.state.write().await = EngineState::Ready;
        self.load_count.fetch_add(1, Ordering::SeqCst);

        let _ = self.events_tx.send(EngineEvent::ManifestParsed { segments });

        let surface = self.surface.read().await.clone();
        if let Some(surface) = surface {
            // Flush buffers left over from the previous source
            if self.load_count.load(Ordering::SeqCst) > 1 {
                if let Err(e) = surface.reset_media().await {
                    warn!(error = %e, "buffer flush before re-feed failed");
                }
            }
            self.spawn_worker().await;
        }
        Ok(())
    }

    /// Stop the worker and drop streaming state ahead of a new source
    async fn stop_streaming(&self) {
        self.stop_worker().await;
        *self.manifest.write().await = None;
    }

    async fn stop_worker(&self) {
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
            debug!(engine = %self.id, "segment worker stopped");
        }
    }

    async fn spawn_worker(&self) {
        if !self.config.enable_worker {
            debug!("background segment worker disabled by configuration");
            return;
        }
        let Some(surface) = self.surface.read().await.clone() else {
            return;
        };
        let Some(manifest) = self.manifest.read().await.clone() else {
            return;
        };

        self.stop_worker().await;

        let client = self.client.clone();
        let events_tx = self.events_tx.clone();
        let low_latency = self.config.low_latency_mode;
        let engine_id = self.id;

        let handle = tokio::spawn(async move {
            for segment in &manifest.segments {
                let data = match client.get(segment.uri.clone()).send().await {
                    Ok(response) if response.status().is_success() => {
                        match response.bytes().await {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                let _ = events_tx.send(EngineEvent::FatalError {
                                    kind: EngineErrorKind::Network,
                                    detail: format!("segment {}: {e}", segment.number),
                                });
                                return;
                            }
                        }
                    }
                    Ok(response) => {
                        let _ = events_tx.send(EngineEvent::FatalError {
                            kind: EngineErrorKind::Network,
                            detail: format!(
                                "segment {}: status {}",
                                segment.number,
                                response.status()
                            ),
                        });
                        return;
                    }
                    Err(e) => {
                        let _ = events_tx.send(EngineEvent::FatalError {
                            kind: EngineErrorKind::Network,
                            detail: format!("segment {}: {e}", segment.number),
                        });
                        return;
                    }
                };

                if let Err(e) = surface.append_media(data).await {
                    let _ = events_tx.send(EngineEvent::FatalError {
                        kind: EngineErrorKind::Media,
                        detail: format!("segment {}: {e}", segment.number),
                    });
                    return;
                }

                if !low_latency {
                    tokio::time::sleep(segment.duration / 2).await;
                }
            }
            debug!(engine = %engine_id, "segment worker drained playlist");
        });

        *self.worker.lock().await = Some(handle);
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        // The async worker handle cannot be awaited here; aborting is
        // enough since the task owns no external resources.
        if let Ok(mut worker) = self.worker.try_lock() {
            if let Some(handle) = worker.take() {
                handle.abort();
            }
        }
    }
}

/// Watch an engine's event stream and drive its bounded in-place recovery.
///
/// Mirrors the fatal-error dispatch the surface shell installs right after
/// engine construction. The task ends when the engine is destroyed.
pub fn spawn_recovery_watch(engine: &Arc<StreamEngine>) -> JoinHandle<()> {
    let weak = Arc::downgrade(engine);
    let mut events = engine.events();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::FatalError { kind, detail }) => {
                    warn!(?kind, %detail, "fatal streaming fault");
                    let Some(engine) = weak.upgrade() else { break };
                    if let Err(e) = engine.handle_fatal(kind).await {
                        warn!(error = %e, "engine recovery failed");
                    }
                }
                Ok(EngineEvent::Destroyed) => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::StreamSegment;
    use crate::surface::fake::FakeSurface;

    fn test_manifest(segment_count: usize) -> StreamManifest {
        let base = Url::parse("https://cdn.example.com/ep1/index.m3u8").unwrap();
        let segments = (0..segment_count)
            .map(|i| StreamSegment {
                number: i as u64,
                uri: base.join(&format!("seg{i}.ts")).unwrap(),
                duration: Duration::from_secs(6),
            })
            .collect();
        StreamManifest {
            segments,
            is_live: false,
            duration: Some(Duration::from_secs(6 * segment_count as u64)),
            base_url: base,
        }
    }

    fn offline_engine() -> StreamEngine {
        // Worker disabled so tests never reach for the network
        StreamEngine::new(EngineConfig {
            enable_worker: false,
            ..Default::default()
        })
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert!(config.enable_worker);
        assert!(config.low_latency_mode);
        assert_eq!(config.max_recovery_attempts, 3);
    }

    #[tokio::test]
    async fn swap_reuses_the_same_instance() {
        let engine = offline_engine();
        let id = engine.id();

        engine.apply_manifest(test_manifest(3)).await.unwrap();
        assert_eq!(engine.state().await, EngineState::Ready);
        assert_eq!(engine.load_count(), 1);

        // Quality switch path: a second manifest lands on the same object
        engine.apply_manifest(test_manifest(5)).await.unwrap();
        assert_eq!(engine.id(), id);
        assert_eq!(engine.load_count(), 2);
        assert_eq!(engine.state().await, EngineState::Ready);
    }

    #[tokio::test]
    async fn manifest_parsed_event_fires_before_play_is_possible() {
        let engine = offline_engine();
        let mut events = engine.events();

        engine.apply_manifest(test_manifest(2)).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::ManifestParsed { segments: 2 }
        );
    }

    #[tokio::test]
    async fn destroyed_engine_rejects_loads() {
        let engine = offline_engine();
        engine.destroy().await;

        let err = engine.apply_manifest(test_manifest(1)).await.unwrap_err();
        assert!(matches!(err, Error::EngineDestroyed));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let engine = offline_engine();
        let surface = Arc::new(FakeSurface::new(false));
        engine.attach(surface.clone()).await.unwrap();

        engine.destroy().await;
        engine.destroy().await;

        // Exactly one detach reached the surface
        let detaches = surface
            .log()
            .iter()
            .filter(|c| **c == "detach_media")
            .count();
        assert_eq!(detaches, 1);
        assert_eq!(engine.state().await, EngineState::Destroyed);
    }

    #[tokio::test]
    async fn media_recovery_resets_pipeline_in_place() {
        let engine = offline_engine();
        let surface = Arc::new(FakeSurface::new(false));
        engine.attach(surface.clone()).await.unwrap();
        engine.apply_manifest(test_manifest(2)).await.unwrap();

        engine.handle_fatal(EngineErrorKind::Media).await.unwrap();

        assert_eq!(surface.state.lock().unwrap().media_resets, 1);
        assert_eq!(engine.state().await, EngineState::Ready);
    }

    #[tokio::test]
    async fn recovery_budget_is_bounded() {
        let engine = offline_engine();
        let surface = Arc::new(FakeSurface::new(false));
        engine.attach(surface.clone()).await.unwrap();
        engine.apply_manifest(test_manifest(2)).await.unwrap();

        for _ in 0..3 {
            engine.handle_fatal(EngineErrorKind::Media).await.unwrap();
        }
        let err = engine
            .handle_fatal(EngineErrorKind::Media)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RecoveryExhausted { attempts: 4 }));
    }

    #[tokio::test]
    async fn new_source_resets_the_recovery_budget() {
        let engine = offline_engine();
        let surface = Arc::new(FakeSurface::new(false));
        engine.attach(surface.clone()).await.unwrap();
        engine.apply_manifest(test_manifest(2)).await.unwrap();

        for _ in 0..3 {
            engine.handle_fatal(EngineErrorKind::Media).await.unwrap();
        }

        // A user-initiated load clears the counter the way load_source does
        engine.recovery_attempts.store(0, Ordering::SeqCst);
        engine.handle_fatal(EngineErrorKind::Media).await.unwrap();
    }

    #[tokio::test]
    async fn fatal_after_destroy_is_ignored() {
        let engine = offline_engine();
        engine.destroy().await;
        // Must not error and must not attempt recovery
        engine.handle_fatal(EngineErrorKind::Network).await.unwrap();
    }
}
