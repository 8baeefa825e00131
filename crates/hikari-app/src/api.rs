//! Catalog backend client
//!
//! The catalog, search, release and stream-variant data all come from an
//! external backend; this module is the only place that knows its wire
//! shapes and endpoints. Everything above consumes the [`CatalogBackend`]
//! trait, so tests and future transports can swap the HTTP client out.

use crate::settings::SettingsStore;
use async_trait::async_trait;
use hikari_core::{EpisodeId, EpisodeRef, Error, PlayableItem, RawVariant, ReleaseId, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Entries fetched per catalog page
pub const PAGE_SIZE: u32 = 15;

const USER_AGENT: &str = concat!("hikari/", env!("CARGO_PKG_VERSION"));

/// Localized title variants of a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleName {
    pub main: String,
    pub english: Option<String>,
    pub alternative: Option<String>,
}

/// Poster image references at different sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterRefs {
    pub src: String,
    pub preview: Option<String>,
    pub thumbnail: Option<String>,
}

impl PosterRefs {
    /// Smallest usable image for list rows
    pub fn best_preview(&self) -> &str {
        self.preview
            .as_deref()
            .or(self.thumbnail.as_deref())
            .unwrap_or(&self.src)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreTag {
    pub id: Option<u64>,
    pub name: String,
}

/// One catalog/search listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub name: TitleName,
    pub poster: PosterRefs,
    pub year: Option<u32>,
    pub description: Option<String>,
    pub genres: Option<Vec<GenreTag>>,
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    data: Vec<CatalogEntry>,
}

/// Release classification shown on the detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseKind {
    pub full_string: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: Uuid,
    pub ordinal: u32,
    pub name: Option<String>,
}

/// One entry of the related-releases graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedRelease {
    pub release: Option<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FranchiseGroup {
    #[serde(default)]
    pub franchise_releases: Vec<RelatedRelease>,
}

/// Full release payload backing a detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub id: u64,
    pub name: TitleName,
    pub poster: PosterRefs,
    pub year: Option<u32>,
    pub description: Option<String>,
    pub genres: Option<Vec<GenreTag>>,
    #[serde(rename = "type")]
    pub kind: Option<ReleaseKind>,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
    #[serde(default)]
    pub related_franchise: Vec<FranchiseGroup>,
}

impl ReleaseDetail {
    /// Immutable playable view of this release for the player
    pub fn to_playable(&self) -> PlayableItem {
        PlayableItem {
            id: ReleaseId(self.id),
            title: self.name.main.clone(),
            episodes: self
                .episodes
                .iter()
                .map(|e| EpisodeRef {
                    id: EpisodeId(e.id),
                    ordinal: e.ordinal,
                })
                .collect(),
        }
    }

    /// Flattened related-releases graph, current release included
    pub fn related_releases(&self) -> Vec<&CatalogEntry> {
        self.related_franchise
            .iter()
            .flat_map(|group| &group.franchise_releases)
            .filter_map(|entry| entry.release.as_ref())
            .collect()
    }
}

/// Per-tier stream addresses for one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeStreams {
    pub hls_1080: Option<String>,
    pub hls_720: Option<String>,
    pub hls_480: Option<String>,
}

impl EpisodeStreams {
    /// Raw variant records in the backend's field order; tiers the backend
    /// did not encode are simply absent
    pub fn into_variants(self) -> Vec<RawVariant> {
        let mut variants = Vec::new();
        if let Some(address) = self.hls_1080 {
            variants.push(RawVariant {
                label: "1080p".into(),
                address,
            });
        }
        if let Some(address) = self.hls_720 {
            variants.push(RawVariant {
                label: "720p".into(),
                address,
            });
        }
        if let Some(address) = self.hls_480 {
            variants.push(RawVariant {
                label: "480p".into(),
                address,
            });
        }
        variants
    }
}

/// Operations consumed from the external catalog collaborator
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Most recent releases for the landing screen
    async fn latest(&self) -> Result<Vec<CatalogEntry>>;

    /// One catalog page; an empty page means the catalog is exhausted.
    /// Pages are 0-based here regardless of the backend's numbering.
    async fn catalog_page(&self, page: u32) -> Result<Vec<CatalogEntry>>;

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>>;

    async fn full_release(&self, id: ReleaseId) -> Result<ReleaseDetail>;

    /// Raw quality-variant records for one episode
    async fn stream_variants(&self, episode: EpisodeId) -> Result<Vec<RawVariant>>;
}

/// Adapter exposing a [`CatalogBackend`] as the core's stream directory
pub struct DirectoryHandle(pub Arc<dyn CatalogBackend>);

#[async_trait]
impl hikari_core::StreamDirectory for DirectoryHandle {
    async fn stream_variants(&self, episode: EpisodeId) -> Result<Vec<RawVariant>> {
        self.0.stream_variants(episode).await
    }
}

/// HTTP implementation of the catalog backend
pub struct HttpBackend {
    client: Client,
    settings: Arc<SettingsStore>,
}

impl HttpBackend {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, settings }
    }

    fn base_url(&self) -> String {
        self.settings.api_url()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(url, "backend request");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "server returned status {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn latest(&self) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/anime/releases/latest", self.base_url());
        self.get_json(&url, &[("limit", PAGE_SIZE.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn catalog_page(&self, page: u32) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/anime/catalog/releases", self.base_url());
        // The backend numbers pages from 1
        let envelope: PageEnvelope = self
            .get_json(
                &url,
                &[
                    ("limit", PAGE_SIZE.to_string()),
                    ("page", (page + 1).to_string()),
                ],
            )
            .await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/app/search/releases", self.base_url());
        self.get_json(&url, &[("query", query.to_string())]).await
    }

    #[instrument(skip(self))]
    async fn full_release(&self, id: ReleaseId) -> Result<ReleaseDetail> {
        let url = format!("{}/anime/releases/{}", self.base_url(), id);
        self.get_json(&url, &[]).await
    }

    #[instrument(skip(self))]
    async fn stream_variants(&self, episode: EpisodeId) -> Result<Vec<RawVariant>> {
        let url = format!("{}/anime/releases/episodes/{}", self.base_url(), episode);
        let streams: EpisodeStreams = self.get_json(&url, &[]).await?;
        Ok(streams.into_variants())
    }
}
