//! Signature extraction with f2py.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::acquire::SourceTree;
use crate::config::{InstallConfig, SourceSelection};
use crate::error::{InstallError, InstallResult};
use crate::runner::{execute, CommandRunner, ToolCommand};

/// Library sub-directory holding the Fortran sources.
pub const SOURCE_SUBDIR: &str = "bufrdc";

/// Hand-picked entry points for [`SourceSelection::Curated`].
pub const CURATED_SOURCES: &[&str] = &[
    "buxdes.F",
    "bufren.F",
    "bufrex.F",
    "btable.F",
    "get_name_unit.F",
    "bus012.F",
    "busel.F",
    "buprs0.F",
    "buprs1.F",
    "buprs2.F",
    "buprs3.F",
    "buukey.F",
    "bupkey.F",
    "buprq.F",
];

/// A generated f2py signature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceDescriptor {
    /// Path of the `.pyf` file.
    pub path: PathBuf,
    /// Python module name declared in the descriptor.
    pub module_name: String,
}

/// Lists the Fortran sources handed to f2py, sorted.
pub fn collect_sources(tree: &SourceTree, selection: SourceSelection) -> InstallResult<Vec<PathBuf>> {
    let source_dir = tree.source_dir.join(SOURCE_SUBDIR);
    let pattern = format!("{}/*.F", glob::Pattern::escape(&source_dir.to_string_lossy()));

    let sources: Vec<PathBuf> = match selection {
        SourceSelection::All => {
            let entries = glob::glob(&pattern).map_err(|e| InstallError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            let mut found: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
            found.sort();
            found
        }
        SourceSelection::Curated => CURATED_SOURCES
            .iter()
            .map(|name| source_dir.join(name))
            .filter(|path| path.is_file())
            .collect(),
    };

    if sources.is_empty() {
        return Err(InstallError::NoSources { pattern });
    }
    debug!("{} fortran sources selected ({})", sources.len(), selection.as_str());
    Ok(sources)
}

/// Runs f2py over the library sources to produce the signature file.
pub fn generate(
    tree: &SourceTree,
    config: &InstallConfig,
    runner: &dyn CommandRunner,
) -> InstallResult<InterfaceDescriptor> {
    let sources = collect_sources(tree, config.sources)?;

    let mut command = ToolCommand::new(&config.f2py, &config.work_dir)
        .args(["--build-dir", config.build_dir_name.as_str()])
        .args(["-m", config.module_name.as_str()])
        .args(["-h", config.signatures_name.as_str()]);
    for source in &sources {
        command = command.path_arg(&relative_to(source, &config.work_dir));
    }
    execute(runner, &command)?;

    let path = config.signatures_path();
    if !path.is_file() {
        return Err(InstallError::SignaturesNotGenerated { path });
    }
    info!("signature file generated: {}", path.display());

    Ok(InterfaceDescriptor {
        path,
        module_name: config.module_name.clone(),
    })
}

/// Expresses `path` relative to `base` when it lies below it, keeping the
/// f2py command line short.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
