//! Versions command implementation
//!
//! Lists the archives offered on the download page and marks the one an
//! install would pick.

use anyhow::{Context, Result};
use colored::Colorize;
use pybufr_build::acquire::{download_url, parse_listing, select_most_recent};
use pybufr_build::{Fetcher, HttpFetcher, InstallConfig, LibraryArchive};
use std::process::ExitCode;

/// Run the versions command
///
/// # Arguments
/// * `config` - Resolved installer configuration
/// * `json` - Print the archive list as JSON
///
/// # Returns
/// Exit code: 0 if at least one archive is listed, 1 otherwise
pub fn run(config: &InstallConfig, json: bool) -> Result<ExitCode> {
    run_with(config, &HttpFetcher, json)
}

fn run_with(config: &InstallConfig, fetcher: &dyn Fetcher, json: bool) -> Result<ExitCode> {
    let page = fetcher
        .fetch_text(&config.listing_url)
        .with_context(|| format!("Failed to fetch listing: {}", config.listing_url))?;
    let archives = parse_listing(&page);
    let latest = select_most_recent(&archives);

    if json {
        let rows: Vec<serde_json::Value> = archives
            .iter()
            .map(|archive| row_json(config, archive, latest))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{} {}", "Listing:".cyan().bold(), config.listing_url);
        println!();
        for archive in &archives {
            let marker = if Some(archive) == latest {
                "*".green().bold()
            } else {
                " ".normal()
            };
            println!(
                "  {} {:<24} {}",
                marker,
                archive.filename,
                archive.date.trim().dimmed()
            );
        }
        println!();
    }

    match latest {
        Some(archive) => {
            if !json {
                println!(
                    "{} {}",
                    "Selected:".green().bold(),
                    download_url(&config.site_url, &archive.url)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            if !json {
                println!("{} no library archives listed", "WARNING".yellow().bold());
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn row_json(
    config: &InstallConfig,
    archive: &LibraryArchive,
    latest: Option<&LibraryArchive>,
) -> serde_json::Value {
    serde_json::json!({
        "filename": archive.filename,
        "date": archive.date.trim(),
        "url": download_url(&config.site_url, &archive.url),
        "selected": Some(archive) == latest,
    })
}
