//! pybufr installer
//!
//! This crate builds the ECMWF BUFR Fortran library and a Python extension
//! module (`ecmwfbufr`) wrapping it, using f2py.
//!
//! # Overview
//!
//! The installation is a linear pipeline of external tools:
//!
//! 1. **Acquire** - find `ecmwf_bufr_lib/*.tar.gz` or download the most
//!    recent archive from the ECMWF listing page, then unpack it with `tar`
//! 2. **Configure** - probe the search path for Fortran and C compilers and
//!    write `config/config.linux_compiler` for the library makefiles
//! 3. **Build** - run `make` and publish `libbufr.a` as a symlink in the work
//!    directory
//! 4. **Bind** - run `f2py -h` over the library sources to generate
//!    `f2py_build/signatures.pyf`, then substitute the array-bound constants
//!    f2py cannot resolve
//! 5. **Link** - run `f2py -c` to compile the extension module
//!
//! Each stage is skipped when its output already exists, and a run with the
//! extension module already present does nothing at all.
//!
//! # Example
//!
//! ```ignore
//! use pybufr_build::{HttpFetcher, InstallConfig, Installer, SystemRunner, WhichProbe};
//!
//! let config = InstallConfig::default().with_env_overrides();
//! let runner = SystemRunner::new();
//! let report = Installer::new(&config, &WhichProbe, &runner, &HttpFetcher).run()?;
//! println!("module: {:?}", report.module);
//! ```
//!
//! # Crate Structure
//!
//! - [`probe`] - Toolchain presence checks
//! - [`configure`] - Compiler selection and build configuration
//! - [`acquire`] - Archive discovery, download and extraction
//! - [`builder`] - Library build and publication
//! - [`bindgen`] - f2py signature generation
//! - [`patch`] - Signature file constant substitution
//! - [`extension`] - Extension module compile/link
//! - [`pipeline`] - The stage driver
//! - [`error`] - Error types

pub mod acquire;
pub mod bindgen;
pub mod builder;
pub mod config;
pub mod configure;
pub mod error;
pub mod extension;
pub mod fetch;
pub mod patch;
pub mod pipeline;
pub mod probe;
pub mod runner;

// Re-export main types at crate root
pub use acquire::{LibraryArchive, SourceTree};
pub use bindgen::InterfaceDescriptor;
pub use builder::StaticArchive;
pub use config::{InstallConfig, SourceSelection};
pub use configure::{BuildConfiguration, CCompiler, FortranCompiler, Toolchain};
pub use error::{FailureKind, InstallError, InstallResult};
pub use extension::ExtensionModule;
pub use fetch::{Fetcher, HttpFetcher};
pub use patch::{ConstantTable, PatchSummary};
pub use pipeline::{InstallReport, Installer, PipelineFailure, Stage};
pub use probe::{FixedProbe, PathProbe, ToolchainCandidate, WhichProbe};
pub use runner::{CommandRunner, SystemRunner, ToolCommand, ToolOutcome};
