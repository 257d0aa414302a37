//! The installation pipeline.
//!
//! ```text
//! need-acquire -> acquired -> configured -> built -> bound -> ready
//! ```
//!
//! Every stage is skipped when its output already exists: an existing
//! extension module ends the run immediately, an existing `libbufr.a` link
//! skips the library build. The first unrecoverable error stops the run and
//! is reported together with the stage it happened in.

use std::fmt;
use std::path::PathBuf;

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::acquire::{self, ExtractOutcome, SourceTree};
use crate::bindgen::{self, InterfaceDescriptor};
use crate::builder::{self, StaticArchive};
use crate::config::InstallConfig;
use crate::configure::{self, BuildConfiguration};
use crate::error::InstallError;
use crate::extension::{self, find_module};
use crate::fetch::Fetcher;
use crate::patch::{self, ConstantTable, PatchSummary};
use crate::probe::PathProbe;
use crate::runner::CommandRunner;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    NeedAcquire,
    Acquired,
    Configured,
    Built,
    Bound,
    Ready,
}

impl Stage {
    /// Returns the string identifier for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NeedAcquire => "need-acquire",
            Stage::Acquired => "acquired",
            Stage::Configured => "configured",
            Stage::Built => "built",
            Stage::Bound => "bound",
            Stage::Ready => "ready",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error together with the stage the pipeline was in.
#[derive(Debug, Error)]
#[error("{error} (stage: {stage})")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: InstallError,
}

/// Record of what a run did.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Last stage reached.
    pub stage: Stage,
    /// The extension module already existed; nothing else ran.
    pub already_installed: bool,
    /// `libbufr.a` was already published; the library build was skipped.
    pub library_reused: bool,
    /// A patched signature file was already present; f2py -h was skipped.
    pub bindings_reused: bool,
    pub source: Option<SourceTree>,
    pub extract: Option<ExtractOutcome>,
    pub build_config: Option<BuildConfiguration>,
    pub config_file: Option<PathBuf>,
    pub archive: Option<StaticArchive>,
    pub descriptor: Option<PathBuf>,
    pub patch: Option<PatchSummary>,
    pub module: Option<PathBuf>,
}

impl InstallReport {
    fn new() -> Self {
        Self {
            stage: Stage::NeedAcquire,
            already_installed: false,
            library_reused: false,
            bindings_reused: false,
            source: None,
            extract: None,
            build_config: None,
            config_file: None,
            archive: None,
            descriptor: None,
            patch: None,
            module: None,
        }
    }

    fn fail(&self, error: InstallError) -> PipelineFailure {
        PipelineFailure {
            stage: self.stage,
            error,
        }
    }
}

/// Drives the whole installation with explicit collaborators.
pub struct Installer<'a> {
    config: &'a InstallConfig,
    probe: &'a dyn PathProbe,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetcher,
    table: ConstantTable,
}

impl<'a> Installer<'a> {
    /// Creates an installer using the BUFR constant table.
    pub fn new(
        config: &'a InstallConfig,
        probe: &'a dyn PathProbe,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            config,
            probe,
            runner,
            fetcher,
            table: ConstantTable::bufr(),
        }
    }

    /// Replaces the constant table used by the signature patcher.
    pub fn with_table(mut self, table: ConstantTable) -> Self {
        self.table = table;
        self
    }

    /// Runs the pipeline to completion or to the first fatal error.
    pub fn run(&self) -> Result<InstallReport, PipelineFailure> {
        let config = self.config;
        let mut report = InstallReport::new();

        if let Some(module) = find_module(&config.work_dir, &config.module_name) {
            info!("python wrapper seems already present: {}", module.display());
            report.already_installed = true;
            report.module = Some(module);
            report.stage = Stage::Ready;
            return Ok(report);
        }

        let published = config.published_library();
        let archive = if published.exists() {
            info!("library seems present");
            report.library_reused = true;
            StaticArchive {
                path: std::fs::canonicalize(&published).unwrap_or_else(|_| published.clone()),
                link: published,
            }
        } else {
            info!("Entering installation sequence:");
            self.install(&mut report)?
        };
        report.archive = Some(archive.clone());
        report.stage = Stage::Built;

        info!("Entering wrapper generation sequence:");
        let descriptor = match self.existing_descriptor() {
            Some(descriptor) => {
                info!(
                    "signature file already generated and patched: {}",
                    descriptor.path.display()
                );
                report.bindings_reused = true;
                descriptor
            }
            None => self.bind(&mut report)?,
        };
        report.descriptor = Some(descriptor.path.clone());
        report.stage = Stage::Bound;

        let module = extension::link(&descriptor, &archive, config, self.runner)
            .map_err(|e| report.fail(e))?;
        report.module = Some(module.path);
        report.stage = Stage::Ready;

        Ok(report)
    }

    /// A descriptor left by an earlier run, recognised by its backup.
    fn existing_descriptor(&self) -> Option<InterfaceDescriptor> {
        let path = self.config.signatures_path();
        if path.is_file() && patch::backup_path(&path).is_file() {
            Some(InterfaceDescriptor {
                path,
                module_name: self.config.module_name.clone(),
            })
        } else {
            None
        }
    }

    /// Generates the signature file and substitutes the array bounds.
    fn bind(&self, report: &mut InstallReport) -> Result<InterfaceDescriptor, PipelineFailure> {
        let tree = match report.source.clone() {
            Some(tree) => tree,
            None => {
                let tree = self.acquire(report)?;
                report.source = Some(tree.clone());
                tree
            }
        };

        let descriptor =
            bindgen::generate(&tree, self.config, self.runner).map_err(|e| report.fail(e))?;
        let summary =
            patch::patch_file(&descriptor.path, &self.table).map_err(|e| report.fail(e))?;
        report.patch = Some(summary);
        Ok(descriptor)
    }

    /// Locates (or downloads) and unpacks the sources.
    fn acquire(&self, report: &mut InstallReport) -> Result<SourceTree, PipelineFailure> {
        let tree = acquire::locate_or_fetch(self.config, self.fetcher).map_err(|e| report.fail(e))?;
        let outcome =
            acquire::extract(&tree, self.config, self.runner).map_err(|e| report.fail(e))?;
        report.extract = Some(outcome);
        Ok(tree)
    }

    /// need-acquire -> acquired -> configured -> built.
    fn install(&self, report: &mut InstallReport) -> Result<StaticArchive, PipelineFailure> {
        let tree = self.acquire(report)?;
        report.source = Some(tree.clone());
        report.stage = Stage::Acquired;

        let build_config = configure::synthesize(self.probe, self.config).map_err(|e| report.fail(e))?;
        let config_file = build_config
            .write(&tree.source_dir)
            .map_err(|e| report.fail(e))?;
        report.config_file = Some(config_file);
        report.build_config = Some(build_config.clone());
        report.stage = Stage::Configured;

        builder::build(&tree, &build_config, self.config, self.runner).map_err(|e| report.fail(e))?;
        builder::publish(&tree, self.config).map_err(|e| report.fail(e))
    }
}
