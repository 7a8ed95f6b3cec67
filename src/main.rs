//! Art Picker - MTG printing and image fetcher
//!
//! Resolves a decklist against Scryfall, caches printing lists and card
//! images under a project directory, and optionally downloads full-quality
//! art for the whole deck.

use art_picker::orchestrator::MetaStatus;
use art_picker::{
    build_deck, DeckEntry, Delivery, DownloadItem, FetchConfig, FilterConfig, Orchestrator,
    Printing, ScryfallClient,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// MTG art picker - fetches and caches Scryfall printings and card images
#[derive(Parser, Debug)]
#[command(name = "art_picker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the decklist file
    decklist: PathBuf,

    /// Project directory (cache and downloads live here)
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Optional file with token queries, one per line
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Prefer borderless printings when no border filter is set
    #[arg(long, default_value_t = false)]
    prefer_borderless: bool,

    /// Exclude Universes Beyond printings
    #[arg(long, default_value_t = false)]
    exclude_ub: bool,

    /// Download the newest printing of every card after resolving
    #[arg(long, default_value_t = false)]
    download: bool,

    /// Destination directory for downloads (default: <project>/art)
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let deck_text = match std::fs::read_to_string(&args.decklist) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to read decklist {}: {}", args.decklist.display(), e);
            std::process::exit(1);
        }
    };
    let token_text = match &args.tokens {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to read token queries {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => String::new(),
    };

    let deck = build_deck(&deck_text, &token_text);
    if deck.is_empty() {
        log::error!("Could not parse any card names or token queries");
        std::process::exit(1);
    }
    log::info!("Parsed {} deck entries", deck.len());

    let filters = FilterConfig {
        prefer_borderless: args.prefer_borderless,
        exclude_ub: args.exclude_ub,
        ..Default::default()
    };

    let cfg = FetchConfig::default();
    let client = Arc::new(ScryfallClient::new(&cfg));
    let (orch, mut rx) = match Orchestrator::new(
        &args.project.join("cache"),
        client.clone(),
        client,
        cfg,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("Failed to start worker pools: {}", e);
            std::process::exit(1);
        }
    };

    // Resolve every entry's printing list, remembering the newest printing.
    let mut resolved: Vec<(DeckEntry, Printing)> = Vec::new();
    for entry in deck {
        orch.set_context(&entry.name, &filters);
        let printings = match orch.ensure_metadata(&entry.name, &entry.query, &filters) {
            MetaStatus::Ready(printings) => Some(printings),
            MetaStatus::Pending => loop {
                match rx.blocking_recv() {
                    Some(Delivery::MetaReady {
                        printings,
                        auto_relaxed,
                        ..
                    }) => {
                        if auto_relaxed {
                            log::warn!(
                                "{}: filters matched too few printings, showing all",
                                entry.name
                            );
                        }
                        break Some(printings);
                    }
                    Some(Delivery::MetaFailed { error, .. }) => {
                        log::error!("{}: {}", entry.name, error);
                        break None;
                    }
                    Some(_) => continue,
                    None => break None,
                }
            },
        };

        match printings.as_ref().and_then(|p| p.first()) {
            Some(newest) => {
                log::info!(
                    "{}: {} printings, newest {} #{}",
                    entry.name,
                    printings.as_ref().map_or(0, |p| p.len()),
                    newest.set_code,
                    newest.collector_number
                );
                resolved.push((entry, newest.clone()));
            }
            None => log::warn!("{}: no printings found", entry.name),
        }
    }

    if args.download {
        let items: Vec<DownloadItem> = resolved
            .iter()
            .filter_map(|(entry, printing)| {
                let (url, ext) = printing.download_target()?;
                Some(DownloadItem {
                    name: entry.name.clone(),
                    url: url.to_string(),
                    ext: ext.to_string(),
                    copies: entry.quantity,
                })
            })
            .collect();

        if items.is_empty() {
            log::warn!("Nothing to download");
        } else {
            let dest = args
                .download_dir
                .unwrap_or_else(|| args.project.join("art"));
            orch.download_batch(items, &dest);
            loop {
                match rx.blocking_recv() {
                    Some(Delivery::DownloadProgress { completed, total }) => {
                        log::info!("Downloaded {}/{}", completed, total);
                    }
                    Some(Delivery::DownloadFinished { dest, cancelled }) => {
                        if cancelled {
                            log::warn!("Download cancelled");
                        } else {
                            log::info!("Download finished: {}", dest.display());
                        }
                        break;
                    }
                    Some(Delivery::DownloadFailed { error }) => {
                        log::error!("Download failed: {}", error);
                        break;
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
        }
    }

    orch.shutdown(Duration::from_secs(5));
}
