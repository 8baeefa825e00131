//! Stream manifest parsing
//!
//! The software streaming engine loads a per-tier manifest before it can
//! feed segments. Addresses supplied by the stream directory normally point
//! straight at a media playlist, but some origins answer with a
//! multivariant playlist; in that case the first variant's playlist is the
//! one to follow.

use crate::{Error, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// One fetchable segment of a stream
#[derive(Debug, Clone)]
pub struct StreamSegment {
    /// Sequence number within the playlist
    pub number: u64,
    /// Absolute URI to fetch
    pub uri: Url,
    /// Segment duration
    pub duration: Duration,
}

/// Parsed manifest for a single quality tier
#[derive(Debug, Clone)]
pub struct StreamManifest {
    /// Segments in playback order
    pub segments: Vec<StreamSegment>,
    /// Whether the playlist is still being appended to (live)
    pub is_live: bool,
    /// Total duration, when the playlist is closed
    pub duration: Option<Duration>,
    /// Base URL the segment URIs were resolved against
    pub base_url: Url,
}

impl StreamManifest {
    /// Longest single segment duration; used for fetch pacing
    pub fn target_duration(&self) -> Duration {
        self.segments
            .iter()
            .map(|s| s.duration)
            .max()
            .unwrap_or(Duration::from_secs(6))
    }
}

/// Outcome of parsing manifest content: either a ready media playlist, or a
/// multivariant playlist pointing at per-tier playlists
#[derive(Debug)]
pub enum ParsedManifest {
    Media(StreamManifest),
    /// Resolved URIs of the variant playlists, in listed order
    Master(Vec<Url>),
}

/// Parse manifest content fetched from `base_url`
pub fn parse_manifest(content: &str, base_url: &Url) -> Result<ParsedManifest> {
    if !content.trim_start().starts_with("#EXTM3U") {
        return Err(Error::ManifestParse("missing #EXTM3U header".into()));
    }

    if content.contains("#EXT-X-STREAM-INF") {
        let master = m3u8_rs::parse_master_playlist_res(content.as_bytes())
            .map_err(|e| Error::ManifestParse(format!("{e:?}")))?;

        let variants = master
            .variants
            .iter()
            .map(|v| resolve_uri(base_url, &v.uri))
            .collect::<Result<Vec<_>>>()?;

        if variants.is_empty() {
            return Err(Error::ManifestParse(
                "multivariant playlist lists no variants".into(),
            ));
        }

        debug!(variants = variants.len(), "multivariant playlist parsed");
        return Ok(ParsedManifest::Master(variants));
    }

    let media = m3u8_rs::parse_media_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("{e:?}")))?;

    let mut segments = Vec::with_capacity(media.segments.len());
    for (idx, seg) in media.segments.iter().enumerate() {
        segments.push(StreamSegment {
            number: media.media_sequence + idx as u64,
            uri: resolve_uri(base_url, &seg.uri)?,
            duration: Duration::from_secs_f32(seg.duration),
        });
    }

    let is_live = !media.end_list;
    let duration = if media.end_list {
        Some(Duration::from_secs_f32(
            media.segments.iter().map(|s| s.duration).sum(),
        ))
    } else {
        None
    };

    debug!(segments = segments.len(), is_live, "media playlist parsed");

    Ok(ParsedManifest::Media(StreamManifest {
        segments,
        is_live,
        duration,
        base_url: base_url.clone(),
    }))
}

/// Resolve a possibly-relative playlist URI against its base
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url> {
    if let Ok(absolute) = Url::parse(uri) {
        return Ok(absolute);
    }
    base.join(uri)
        .map_err(|e| Error::ManifestParse(format!("invalid segment uri {uri}: {e}")))
}
