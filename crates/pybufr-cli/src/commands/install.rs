//! Install command implementation
//!
//! Runs the whole pipeline: acquire, configure, build, bind, link.

use anyhow::{Context, Result};
use colored::Colorize;
use pybufr_build::{
    HttpFetcher, InstallConfig, InstallReport, Installer, PipelineFailure, SystemRunner,
    WhichProbe,
};
use std::process::ExitCode;

/// Run the install command
///
/// # Arguments
/// * `config` - Resolved installer configuration
/// * `json` - Print a machine-readable report instead of the summary
///
/// # Returns
/// Exit code: 0 success, 1 if any stage failed
pub fn run(config: &InstallConfig, json: bool) -> Result<ExitCode> {
    if !json {
        println!("{}", "pybufr install".cyan().bold());
        println!("{} {}", "Work directory:".blue().bold(), config.work_dir.display());
        println!("{} {}", "Sources:".blue().bold(), config.sources.as_str());
        println!();
    }

    std::fs::create_dir_all(&config.work_dir).with_context(|| {
        format!(
            "Failed to create work directory: {}",
            config.work_dir.display()
        )
    })?;

    let runner = if json {
        SystemRunner::quiet()
    } else {
        SystemRunner::new()
    };
    let installer = Installer::new(config, &WhichProbe, &runner, &HttpFetcher);

    match installer.run() {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&failure_json(&failure))?);
            } else {
                print_failure(&failure);
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn print_summary(report: &InstallReport) {
    println!();
    if report.already_installed {
        println!(
            "{} python wrapper already present, nothing to do",
            "SUCCESS".green().bold()
        );
    } else {
        if report.library_reused {
            println!("  {} libbufr.a (already built)", "->".green());
        } else if let Some(build) = &report.build_config {
            println!(
                "  {} libbufr.a built with {} / {}",
                "->".green(),
                build.toolchain.fortran,
                build.toolchain.c
            );
        }
        if report.bindings_reused {
            println!("  {} signatures.pyf (already patched)", "->".green());
        } else if let Some(patch) = &report.patch {
            println!(
                "  {} {} constants substituted ({} backup kept)",
                "->".green(),
                patch.stats.substitutions,
                patch.backup.display()
            );
        }
        println!("{} extension module generated", "SUCCESS".green().bold());
    }
    if let Some(module) = &report.module {
        println!("  {}", module.display());
    }
}

fn print_failure(failure: &PipelineFailure) {
    eprintln!();
    eprintln!(
        "{} [{}/{}] {}",
        "ERROR".red().bold(),
        failure.error.kind().as_str(),
        failure.error.code(),
        failure.error
    );
    eprintln!(
        "     {}",
        format!("installation stopped at stage '{}'", failure.stage).dimmed()
    );
}

fn failure_json(failure: &PipelineFailure) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "stage": failure.stage,
        "kind": failure.error.kind(),
        "code": failure.error.code(),
        "message": failure.error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pybufr_build::{InstallError, Stage};

    #[test]
    fn test_failure_json() {
        let failure = PipelineFailure {
            stage: Stage::Configured,
            error: InstallError::LibraryNotBuilt {
                path: "ecmwf_bufr_lib/bufr_000380/libbufr.a".into(),
            },
        };
        let value = failure_json(&failure);
        assert_eq!(value["ok"], false);
        assert_eq!(value["stage"], "configured");
        assert_eq!(value["kind"], "artifact_missing");
        assert_eq!(value["code"], "PYBUFR_007");
    }
}
