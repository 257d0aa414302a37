//! Patch command implementation
//!
//! Substitutes the BUFR array-bound constants into an existing f2py
//! signature file.

use anyhow::{Context, Result};
use colored::Colorize;
use pybufr_build::patch::patch_file;
use pybufr_build::ConstantTable;
use std::path::Path;
use std::process::ExitCode;

/// Run the patch command
///
/// # Arguments
/// * `path` - Signature file to rewrite in place
/// * `json` - Print the patch summary as JSON
///
/// # Returns
/// Exit code: 0 on success
pub fn run(path: &Path, json: bool) -> Result<ExitCode> {
    if !json {
        println!("{} {}", "Patching:".cyan().bold(), path.display());
    }

    let summary = patch_file(path, &ConstantTable::bufr())
        .with_context(|| format!("Failed to patch signature file: {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "  {} {} of {} lines changed, {} substitutions",
            "->".green(),
            summary.stats.lines_changed,
            summary.stats.lines_total,
            summary.stats.substitutions
        );
        println!("  {} backup: {}", "->".green(), summary.backup.display());
        println!("{} Patched in place", "SUCCESS".green().bold());
    }
    Ok(ExitCode::SUCCESS)
}
