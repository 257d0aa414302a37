//! Locating, downloading and unpacking the library sources.
//!
//! The most recent release is picked by plain string comparison of the
//! archive file names (`bufr_000380.tar.gz` > `bufr_000370.tar.gz`). Neither
//! the embedded version number nor the listed date is parsed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;
use serde::Serialize;

use crate::config::InstallConfig;
use crate::error::{InstallError, InstallResult};
use crate::fetch::Fetcher;
use crate::runner::{execute, CommandRunner, ToolCommand};

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Listing rows look like
/// `<TD WIDTH="37%"><A HREF="path/bufr_000380.tar.gz" class="sowtware">bufr_000380.tar.gz</A> 28.07.2009</TD>`.
fn listing_row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^<TD .*><A HREF="(.*)" .*>(.*)</A>(.*)</TD>"#)
            .expect("listing row pattern is valid")
    })
}

/// A downloadable archive advertised on the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryArchive {
    /// Link target, usually relative to the site root.
    pub url: String,
    /// Archive file name, e.g. `bufr_000380.tar.gz`.
    pub filename: String,
    /// Trailing date cell text, unparsed.
    pub date: String,
}

/// Parses every archive row of a listing page.
pub fn parse_listing(page: &str) -> Vec<LibraryArchive> {
    let pattern = listing_row_pattern();
    page.lines()
        .filter(|line| line.contains(ARCHIVE_SUFFIX))
        .filter_map(|line| pattern.captures(line))
        .map(|caps| LibraryArchive {
            url: caps[1].to_string(),
            filename: caps[2].to_string(),
            date: caps[3].to_string(),
        })
        .collect()
}

/// Picks the archive with the greatest file name. Ties keep the first.
pub fn select_most_recent(archives: &[LibraryArchive]) -> Option<&LibraryArchive> {
    archives.iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.filename <= current.filename => Some(current),
        _ => Some(candidate),
    })
}

/// Resolves an archive link against the site root.
pub fn download_url(site_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        link.trim_start_matches('/')
    )
}

/// Extracted (or to-be-extracted) library sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTree {
    /// Path of the `.tar.gz` archive.
    pub archive: PathBuf,
    /// Archive file name.
    pub archive_name: String,
    /// Directory the archive unpacks into.
    pub source_dir: PathBuf,
}

impl SourceTree {
    /// Derives the source tree from an archive path by stripping both
    /// extensions of `name.tar.gz`.
    pub fn from_archive(archive: &Path) -> Option<Self> {
        let archive_name = archive.file_name()?.to_str()?.to_string();
        let tar_name = Path::new(&archive_name).file_stem()?;
        let dir_name = Path::new(tar_name).file_stem()?;
        let parent = archive.parent().unwrap_or_else(|| Path::new(""));
        Some(Self {
            archive: archive.to_path_buf(),
            source_dir: parent.join(dir_name),
            archive_name,
        })
    }

    /// Whether the source directory exists. A partially unpacked tree
    /// counts as present.
    pub fn is_extracted(&self) -> bool {
        self.source_dir.is_dir()
    }
}

/// Finds the greatest local archive in `lib_dir`, if any.
pub fn locate_local(lib_dir: &Path) -> InstallResult<Option<SourceTree>> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&lib_dir.to_string_lossy()),
        ARCHIVE_SUFFIX
    );
    let entries = glob::glob(&pattern).map_err(|e| InstallError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut archives: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    archives.sort();
    archives.reverse();
    debug!("available library archives: {:?}", archives);

    Ok(archives.first().and_then(|path| {
        debug!("most recent library archive: {}", path.display());
        SourceTree::from_archive(path)
    }))
}

/// Fetches the listing page and downloads the most recent archive into the
/// library directory.
pub fn fetch_latest(config: &InstallConfig, fetcher: &dyn Fetcher) -> InstallResult<LibraryArchive> {
    let lib_dir = config.lib_dir();
    std::fs::create_dir_all(&lib_dir).map_err(|e| InstallError::write_failed(&lib_dir, e))?;

    debug!("setting up connection to {}", config.listing_url);
    let page = fetcher.fetch_text(&config.listing_url)?;
    debug!("download page retrieved successfully");

    let archives = parse_listing(&page);
    let latest = select_most_recent(&archives)
        .cloned()
        .ok_or_else(|| InstallError::NoArchivesListed {
            url: config.listing_url.clone(),
        })?;
    info!(
        "Most recent library version seems to be: {} ({})",
        latest.filename,
        latest.date.trim()
    );

    let file_name = Path::new(&latest.filename)
        .file_name()
        .ok_or_else(|| InstallError::NoArchivesListed {
            url: config.listing_url.clone(),
        })?;
    let dest = lib_dir.join(file_name);
    let url = download_url(&config.site_url, &latest.url);
    info!("Downloading {}", url);

    let mut file = File::create(&dest).map_err(|e| InstallError::write_failed(&dest, e))?;
    match fetcher.fetch_to(&url, &mut file) {
        Ok(bytes) => debug!("created local copy of {} ({} bytes)", dest.display(), bytes),
        Err(e) => {
            drop(file);
            let _ = std::fs::remove_file(&dest);
            return Err(e);
        }
    }

    Ok(latest)
}

/// Returns the local source tree, downloading the latest archive first if
/// none is present.
pub fn locate_or_fetch(config: &InstallConfig, fetcher: &dyn Fetcher) -> InstallResult<SourceTree> {
    let lib_dir = config.lib_dir();
    if let Some(tree) = locate_local(&lib_dir)? {
        return Ok(tree);
    }

    fetch_latest(config, fetcher)?;
    locate_local(&lib_dir)?.ok_or(InstallError::ArchiveNotFound { dir: lib_dir })
}

/// Whether `extract` unpacked the archive or found it already unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractOutcome {
    Extracted,
    AlreadyPresent,
}

/// Unpacks the archive unless its source directory already exists.
pub fn extract(
    tree: &SourceTree,
    config: &InstallConfig,
    runner: &dyn CommandRunner,
) -> InstallResult<ExtractOutcome> {
    if tree.is_extracted() {
        info!("path exists: {}", tree.source_dir.display());
        info!("assuming the package is already unpacked...");
        return Ok(ExtractOutcome::AlreadyPresent);
    }

    let cwd = tree
        .archive
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.lib_dir());
    let command = ToolCommand::new(&config.tar, cwd).args(["zxvf", tree.archive_name.as_str()]);
    execute(runner, &command)?;

    if !tree.is_extracted() {
        return Err(InstallError::SourcesNotExtracted {
            archive: tree.archive.clone(),
            dir: tree.source_dir.clone(),
        });
    }
    Ok(ExtractOutcome::Extracted)
}
