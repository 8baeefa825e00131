//! CLI command implementations

use crate::output::emit;
use anyhow::{Context, Result};
use hikari_app::{CatalogBackend, CatalogEntry, DirectoryHandle, HttpBackend, SettingsStore};
use hikari_core::manifest::{parse_manifest, ParsedManifest};
use hikari_core::{EpisodeId, ReleaseId, VariantResolver};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Build the HTTP backend from persisted settings, honoring a
/// per-invocation address override
pub fn backend(api_url: Option<String>) -> Result<Arc<HttpBackend>> {
    let path = SettingsStore::default_path()?;
    let settings = Arc::new(SettingsStore::open(path)?);
    if let Some(api_url) = api_url {
        settings.override_api_url(api_url);
    }
    Ok(Arc::new(HttpBackend::new(settings)))
}

fn print_entries(entries: &[CatalogEntry]) {
    if entries.is_empty() {
        println!("(no entries)");
        return;
    }
    for entry in entries {
        let year = entry
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "—".into());
        let genres = entry
            .genres
            .as_ref()
            .map(|g| {
                g.iter()
                    .map(|tag| tag.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!("  {:>8}  {} ({year})  [{genres}]", entry.id, entry.name.main);
    }
}

/// List the latest releases
pub async fn latest(backend: &HttpBackend, format: &str) -> Result<()> {
    let entries = backend.latest().await?;
    emit(&entries, format, |entries| {
        println!("Latest releases: {}", entries.len());
        print_entries(entries);
    });
    Ok(())
}

/// List one catalog page
pub async fn catalog(backend: &HttpBackend, page: u32, format: &str) -> Result<()> {
    let entries = backend.catalog_page(page).await?;
    emit(&entries, format, |entries| {
        if entries.is_empty() {
            println!("Page {page} is empty (catalog exhausted)");
        } else {
            println!("Catalog page {page}: {} entries", entries.len());
            print_entries(entries);
        }
    });
    Ok(())
}

/// Search the catalog
pub async fn search(backend: &HttpBackend, query: &str, format: &str) -> Result<()> {
    anyhow::ensure!(
        query.trim().chars().count() >= hikari_app::MIN_SEARCH_LEN,
        "query must be at least {} characters",
        hikari_app::MIN_SEARCH_LEN
    );

    let entries = backend.search(query.trim()).await?;
    emit(&entries, format, |entries| {
        println!("Search results for {query:?}: {}", entries.len());
        print_entries(entries);
    });
    Ok(())
}

/// Show a release with its episode list
pub async fn release(backend: &HttpBackend, id: u64, format: &str) -> Result<()> {
    let detail = backend.full_release(ReleaseId(id)).await?;
    emit(&detail, format, |detail| {
        println!("{} ({})", detail.name.main, detail.id);
        if let Some(year) = detail.year {
            println!("  Year: {year}");
        }
        if let Some(kind) = detail.kind.as_ref().and_then(|k| k.full_string.as_deref()) {
            println!("  Type: {kind}");
        }
        println!("  Episodes: {}", detail.episodes.len());
        for episode in &detail.episodes {
            println!("    {:>3}  {}", episode.ordinal, episode.id);
        }
        let related = detail.related_releases();
        if !related.is_empty() {
            println!("  Related releases: {}", related.len());
        }
    });
    Ok(())
}

/// Resolve the quality ladder for an episode
pub async fn variants(backend: Arc<HttpBackend>, episode: &str, format: &str) -> Result<()> {
    let episode = EpisodeId(
        Uuid::parse_str(episode).context("episode identifier must be a UUID")?,
    );

    let backend: Arc<dyn CatalogBackend> = backend;
    let resolver = VariantResolver::new(Arc::new(DirectoryHandle(backend)));
    let variants = resolver.resolve(episode).await?;

    emit(&variants, format, |variants| {
        println!("Quality ladder for {episode}:");
        for variant in variants {
            println!("  {:<14}  {}", variant.menu_label(), variant.uri);
        }
    });
    Ok(())
}

/// Probe a stream manifest
pub async fn probe(manifest_url: &str, segments: usize, format: &str) -> Result<()> {
    let url = Url::parse(manifest_url).context("invalid manifest URL")?;

    let client = reqwest::Client::new();
    let content = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    match parse_manifest(&content, &url)? {
        ParsedManifest::Master(variant_uris) => {
            emit(
                &variant_uris
                    .iter()
                    .map(|u| u.to_string())
                    .collect::<Vec<_>>(),
                format,
                |uris| {
                    println!("Multivariant playlist with {} variants:", uris.len());
                    for uri in uris {
                        println!("  {uri}");
                    }
                },
            );
        }
        ParsedManifest::Media(manifest) => {
            println!("Media playlist: {} segments", manifest.segments.len());
            println!("  Live: {}", manifest.is_live);
            if let Some(duration) = manifest.duration {
                println!("  Duration: {:.1}s", duration.as_secs_f64());
            }
            println!(
                "  Target segment duration: {:.1}s",
                manifest.target_duration().as_secs_f64()
            );

            if segments > 0 {
                let test_count = segments.min(manifest.segments.len());
                let mut passed = 0;
                for segment in manifest.segments.iter().take(test_count) {
                    print!("  Testing segment {}... ", segment.number);
                    match client.head(segment.uri.as_str()).send().await {
                        Ok(resp) if resp.status().is_success() => {
                            println!("PASS");
                            passed += 1;
                        }
                        Ok(resp) => println!("FAIL ({})", resp.status()),
                        Err(e) => println!("FAIL ({e})"),
                    }
                }
                println!("\nResults: {passed}/{test_count} segments accessible");
                if passed < test_count {
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
