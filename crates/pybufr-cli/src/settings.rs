//! Resolution of the installer configuration from flags, file and environment.

use anyhow::{Context, Result};
use clap::Args;
use pybufr_build::{InstallConfig, SourceSelection};
use std::path::{Path, PathBuf};

/// Flags shared by every command that touches the work directory.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file (keys of InstallConfig; missing keys keep defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Work directory holding libbufr.a and the extension module (default: .)
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Listing page to scrape for library archives
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Pass only the hand-picked entry points to f2py instead of all sources
    #[arg(long)]
    pub curated: bool,

    /// Let g95 take part in compiler selection
    #[arg(long)]
    pub enable_g95: bool,
}

impl ConfigArgs {
    /// Builds the effective configuration.
    ///
    /// Precedence: flags, then `PYBUFR_*` environment variables, then the
    /// config file, then defaults.
    pub fn resolve(&self) -> Result<InstallConfig> {
        let base = match &self.config {
            Some(path) => load_file(path)?,
            None => InstallConfig::default(),
        };
        let mut config = base.with_env_overrides();

        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(url) = &self.listing_url {
            config.listing_url = url.clone();
        }
        if self.curated {
            config.sources = SourceSelection::Curated;
        }
        if self.enable_g95 {
            config.enable_g95 = true;
        }
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<InstallConfig> {
    InstallConfig::from_json_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}
