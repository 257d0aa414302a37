//! pybufr CLI - builds the ECMWF BUFR library and its Python extension
//!
//! This binary drives the installer pipeline and a few diagnostic commands
//! around it.

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;
use pybufr_build::InstallError;
use std::path::PathBuf;
use std::process::ExitCode;

use pybufr_cli::commands;
use pybufr_cli::settings::ConfigArgs;

/// pybufr - ECMWF BUFR library installer
#[derive(Parser)]
#[command(name = "pybufr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log every probe and command at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, build and wrap the BUFR library
    Install {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output a machine-readable JSON report (tool output suppressed)
        #[arg(long)]
        json: bool,
    },

    /// Check compilers, tools and the work directory
    Doctor {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List the library archives on the download page
    Versions {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Substitute BUFR array bounds into an f2py signature file
    Patch {
        /// Signature file to rewrite (a .bak copy is kept)
        file: PathBuf,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Install { config, json } => config.resolve().and_then(|config| {
            debug!("resolved configuration: {:?}", config);
            commands::install::run(&config, json)
        }),
        Commands::Doctor { config } => config
            .resolve()
            .and_then(|config| commands::doctor::run(&config)),
        Commands::Versions { config, json } => config
            .resolve()
            .and_then(|config| commands::versions::run(&config, json)),
        Commands::Patch { file, json } => commands::patch::run(&file, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            match e.chain().find_map(|c| c.downcast_ref::<InstallError>()) {
                Some(install) => eprintln!(
                    "{} [{}/{}]: {:#}",
                    "error".red(),
                    install.kind().as_str(),
                    install.code(),
                    e
                ),
                None => eprintln!("{}: {:#}", "error".red(), e),
            }
            ExitCode::from(1)
        }
    }
}
