//! Doctor command implementation
//!
//! Checks the toolchain and the state of the work directory.

use anyhow::Result;
use colored::Colorize;
use pybufr_build::acquire::locate_local;
use pybufr_build::configure::{self, C_PRIORITY, FORTRAN_PRIORITY};
use pybufr_build::extension::find_module;
use pybufr_build::probe::probe_all;
use pybufr_build::{FortranCompiler, InstallConfig, PathProbe, WhichProbe};
use std::process::ExitCode;

/// Run the doctor command
///
/// Checks:
/// - Fortran and C compilers, in selection order
/// - f2py, make and tar
/// - The build configuration that would be written
/// - Artifacts already present in the work directory
///
/// # Returns
/// Exit code: 0 if an install could proceed, 1 otherwise
pub fn run(config: &InstallConfig) -> Result<ExitCode> {
    let ok = check(config, &WhichProbe);
    println!();
    if ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

/// Prints every check and returns whether an install could proceed.
fn check(config: &InstallConfig, probe: &dyn PathProbe) -> bool {
    println!("{}", "pybufr Doctor".cyan().bold());
    println!("{}", "=============".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!("  {} pybufr v{}", "->".green(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", "Compilers:".bold());
    let fortran: Vec<&str> = FORTRAN_PRIORITY.iter().map(|c| c.command()).collect();
    for candidate in probe_all(probe, &fortran) {
        let disabled = candidate.name == FortranCompiler::G95.command() && !config.enable_g95;
        if !candidate.present {
            println!("  {} {} not found", "--".dimmed(), candidate.name);
        } else if disabled {
            println!(
                "  {} {} (found, disabled: pass --enable-g95 to use it)",
                "!!".yellow(),
                candidate.name
            );
        } else {
            println!("  {} {}", "ok".green(), candidate.name);
        }
    }
    let c: Vec<&str> = C_PRIORITY.iter().map(|c| c.command()).collect();
    for candidate in probe_all(probe, &c) {
        if candidate.present {
            println!("  {} {}", "ok".green(), candidate.name);
        } else {
            println!("  {} {} not found", "--".dimmed(), candidate.name);
        }
    }
    println!();

    println!("{}", "Tools:".bold());
    let tools = [config.f2py.as_str(), config.make.as_str(), config.tar.as_str()];
    for candidate in probe_all(probe, &tools) {
        if candidate.present {
            println!("  {} {}", "ok".green(), candidate.name);
        } else {
            println!("  {} {} not found in PATH", "!!".red(), candidate.name);
            all_ok = false;
        }
    }
    println!();

    println!("{}", "Build configuration:".bold());
    match configure::synthesize(probe, config) {
        Ok(build) => {
            println!("  {} {}", "ok".green(), build.name.file_name());
            for line in build.render().lines() {
                println!("     {}", line.dimmed());
            }
        }
        Err(e) => {
            println!("  {} {}", "!!".red(), e);
            all_ok = false;
        }
    }
    println!();

    println!("{}", "Work directory:".bold());
    println!("  {} {}", "->".green(), config.work_dir.display());
    if let Some(module) = find_module(&config.work_dir, &config.module_name) {
        println!("  {} extension module {}", "ok".green(), module.display());
    }
    if config.published_library().exists() {
        println!("  {} libbufr.a already built", "ok".green());
    }
    match locate_local(&config.lib_dir()) {
        Ok(Some(tree)) => {
            let state = if tree.is_extracted() {
                "unpacked"
            } else {
                "not unpacked"
            };
            println!(
                "  {} local archive {} ({})",
                "ok".green(),
                tree.archive.display(),
                state
            );
        }
        Ok(None) => println!(
            "  {} no local archive, install will download one",
            "->".dimmed()
        ),
        Err(e) => {
            println!("  {} {}", "!!".red(), e);
            all_ok = false;
        }
    }

    all_ok
}
