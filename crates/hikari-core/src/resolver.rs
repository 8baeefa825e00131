//! Source descriptor resolution
//!
//! Turns the stream directory's raw (label, address) records for an episode
//! into the ordered quality-variant set the player and the quality menu
//! consume: known tiers ranked highest first, duplicates collapsed, and the
//! first entry designated as the default/"auto" selection.

use crate::{
    types::{EpisodeId, QualityTier, QualityVariant, RawVariant},
    Error, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Stream-address lookup for one episode, served by the external catalog
/// collaborator
#[async_trait]
pub trait StreamDirectory: Send + Sync {
    async fn stream_variants(&self, episode: EpisodeId) -> Result<Vec<RawVariant>>;
}

/// Resolves an episode identifier into its ordered quality-variant set
pub struct VariantResolver {
    directory: Arc<dyn StreamDirectory>,
}

impl VariantResolver {
    pub fn new(directory: Arc<dyn StreamDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve `episode` to its ordered variants.
    ///
    /// Fails with [`Error::NoVariants`] when the directory yields no usable
    /// stream addresses; playback must surface that, never no-op.
    pub async fn resolve(&self, episode: EpisodeId) -> Result<Vec<QualityVariant>> {
        let records = self.directory.stream_variants(episode).await?;

        let mut variants: Vec<QualityVariant> = Vec::with_capacity(records.len());
        for record in &records {
            let Some(tier) = QualityTier::parse_label(&record.label) else {
                warn!(label = %record.label, %episode, "skipping unrecognized quality label");
                continue;
            };
            if variants.iter().any(|v| v.tier == tier) {
                warn!(tier = %tier, %episode, "duplicate quality label ignored");
                continue;
            }
            let uri = match Url::parse(&record.address) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!(tier = %tier, error = %e, "skipping variant with invalid address");
                    continue;
                }
            };
            variants.push(QualityVariant {
                tier,
                uri,
                is_auto: false,
            });
        }

        if variants.is_empty() {
            return Err(Error::NoVariants { episode });
        }

        // Highest quality first; the leading entry doubles as "auto"
        variants.sort_by_key(|v| v.tier);
        variants[0].is_auto = true;

        debug!(
            %episode,
            count = variants.len(),
            default = %variants[0].tier,
            "variants resolved"
        );
        Ok(variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDirectory(Vec<RawVariant>);

    #[async_trait]
    impl StreamDirectory for FixedDirectory {
        async fn stream_variants(&self, _episode: EpisodeId) -> Result<Vec<RawVariant>> {
            Ok(self.0.clone())
        }
    }

    fn raw(label: &str, address: &str) -> RawVariant {
        RawVariant {
            label: label.into(),
            address: address.into(),
        }
    }

    fn resolver(records: Vec<RawVariant>) -> VariantResolver {
        VariantResolver::new(Arc::new(FixedDirectory(records)))
    }

    #[tokio::test]
    async fn orders_highest_first_and_flags_auto() {
        let resolver = resolver(vec![
            raw("480p", "https://cdn.example.com/ep1/480.m3u8"),
            raw("1080p", "https://cdn.example.com/ep1/1080.m3u8"),
            raw("720p", "https://cdn.example.com/ep1/720.m3u8"),
        ]);

        let variants = resolver.resolve(EpisodeId::new()).await.unwrap();
        let tiers: Vec<_> = variants.iter().map(|v| v.tier).collect();
        assert_eq!(
            tiers,
            vec![QualityTier::FullHd, QualityTier::Hd, QualityTier::Sd]
        );
        assert!(variants[0].is_auto);
        assert!(!variants[1].is_auto);
        assert_eq!(variants[0].menu_label(), "Auto (1080p)");
    }

    #[tokio::test]
    async fn missing_tiers_are_omitted_not_padded() {
        let resolver = resolver(vec![raw("720p", "https://cdn.example.com/ep1/720.m3u8")]);

        let variants = resolver.resolve(EpisodeId::new()).await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].tier, QualityTier::Hd);
        assert!(variants[0].is_auto);
        assert_eq!(variants[0].menu_label(), "Auto (720p)");
    }

    #[tokio::test]
    async fn empty_directory_is_an_error() {
        let episode = EpisodeId::new();
        let err = resolver(vec![]).resolve(episode).await.unwrap_err();
        assert!(matches!(err, Error::NoVariants { episode: e } if e == episode));
    }

    #[tokio::test]
    async fn unknown_labels_and_bad_addresses_are_skipped() {
        let resolver = resolver(vec![
            raw("4K", "https://cdn.example.com/ep1/4k.m3u8"),
            raw("1080p", "not a uri"),
            raw("720p", "https://cdn.example.com/ep1/720.m3u8"),
        ]);

        let variants = resolver.resolve(EpisodeId::new()).await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].tier, QualityTier::Hd);
    }

    #[tokio::test]
    async fn duplicate_labels_keep_the_first_record() {
        let resolver = resolver(vec![
            raw("1080p", "https://cdn.example.com/ep1/1080-a.m3u8"),
            raw("1080p", "https://cdn.example.com/ep1/1080-b.m3u8"),
        ]);

        let variants = resolver.resolve(EpisodeId::new()).await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(
            variants[0].uri.as_str(),
            "https://cdn.example.com/ep1/1080-a.m3u8"
        );
    }
}
