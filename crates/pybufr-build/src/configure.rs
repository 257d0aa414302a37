//! Compiler selection and build configuration synthesis.
//!
//! The configuration files shipped with the BUFR library target compiler
//! versions that are long gone, so a configuration is always generated from
//! the detected toolchain and written under a name upstream never uses
//! (`config.linux_compiler`).
//!
//! The library hard-codes 32-bit integers in its interfacing on linux; the
//! 64-bit tags (`R64`, `A64`) therefore stay empty even on 64-bit hosts.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::config::InstallConfig;
use crate::error::{InstallError, InstallResult};
use crate::probe::{probe_all, PathProbe};

const BASE_FFLAGS: &[&str] = &["-O", "-Dlinux"];
const FORTRAN_INTEGER_FLAG: &str = "-i4";
const C_INTEGER_FLAG: &str = "-DFOPEN64";

/// Archiver used to create `libbufr.a`.
pub const ARCHIVER: &str = "ar";
/// Archive indexer run after archiving.
pub const ARCHIVE_INDEXER: &str = "/usr/bin/ranlib";

/// Supported Fortran compilers, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FortranCompiler {
    G95,
    Gfortran,
    G77,
    /// Generic alias, usually a commercial compiler symlinked as `f90`.
    F90,
    /// Generic alias, usually a commercial compiler symlinked as `f77`.
    F77,
}

/// Fortran compilers from most to least preferred.
pub const FORTRAN_PRIORITY: [FortranCompiler; 5] = [
    FortranCompiler::G95,
    FortranCompiler::Gfortran,
    FortranCompiler::G77,
    FortranCompiler::F90,
    FortranCompiler::F77,
];

impl FortranCompiler {
    /// Command name on the search path.
    pub fn command(&self) -> &'static str {
        match self {
            FortranCompiler::G95 => "g95",
            FortranCompiler::Gfortran => "gfortran",
            FortranCompiler::G77 => "g77",
            FortranCompiler::F90 => "f90",
            FortranCompiler::F77 => "f77",
        }
    }

    /// Fortran flags added on top of the base profile.
    pub fn extra_fflags(&self) -> &'static [&'static str] {
        match self {
            FortranCompiler::G95 => &["-fno-second-underscore", "-r8", "-fPIC"],
            FortranCompiler::Gfortran => &["-fno-second-underscore", "-fPIC"],
            FortranCompiler::G77 | FortranCompiler::F90 | FortranCompiler::F77 => &[],
        }
    }

    /// C flags added when this Fortran compiler is selected.
    pub fn extra_cflags(&self) -> &'static [&'static str] {
        match self {
            FortranCompiler::G95 | FortranCompiler::Gfortran => &["-fPIC"],
            FortranCompiler::G77 | FortranCompiler::F90 | FortranCompiler::F77 => &[],
        }
    }

    /// Flag forcing 4-byte default integers, if the compiler has one.
    ///
    /// gfortran has no explicit switch; 4 bytes is its default.
    pub fn integer_flag(&self) -> Option<&'static str> {
        match self {
            FortranCompiler::Gfortran => None,
            _ => Some(FORTRAN_INTEGER_FLAG),
        }
    }
}

impl fmt::Display for FortranCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Supported C compilers, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CCompiler {
    Gcc,
    /// Generic alias for whatever C compiler is installed.
    Cc,
}

/// C compilers from most to least preferred.
pub const C_PRIORITY: [CCompiler; 2] = [CCompiler::Gcc, CCompiler::Cc];

impl CCompiler {
    /// Command name on the search path.
    pub fn command(&self) -> &'static str {
        match self {
            CCompiler::Gcc => "gcc",
            CCompiler::Cc => "cc",
        }
    }
}

impl fmt::Display for CCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// The selected compiler pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub fortran: FortranCompiler,
    pub c: CCompiler,
}

/// Tags the BUFR makefiles combine into a configuration file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfigName {
    pub arch: String,
    pub compiler_tag: String,
    pub r64: String,
    pub a64: String,
}

impl Default for BuildConfigName {
    fn default() -> Self {
        Self {
            arch: "linux".to_string(),
            compiler_tag: "_compiler".to_string(),
            r64: String::new(),
            a64: String::new(),
        }
    }
}

impl BuildConfigName {
    /// File name the makefiles look for, e.g. `config.linux_compiler`.
    pub fn file_name(&self) -> String {
        format!(
            "config.{}{}{}{}",
            self.arch, self.compiler_tag, self.r64, self.a64
        )
    }

    /// Variable assignments passed on the make command line.
    pub fn make_args(&self) -> Vec<String> {
        vec![
            format!("ARCH={}", self.arch),
            format!("CNAME={}", self.compiler_tag),
            format!("R64={}", self.r64),
            format!("A64={}", self.a64),
        ]
    }
}

/// A synthesized build configuration for the BUFR makefiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    pub name: BuildConfigName,
    pub toolchain: Toolchain,
    pub archiver: String,
    pub archiver_flags: String,
    pub c_flags: Vec<String>,
    pub fortran_flags: Vec<String>,
    pub vectorized_fortran_flags: Vec<String>,
    pub archive_indexer: String,
}

impl BuildConfiguration {
    /// Builds the configuration for a selected toolchain.
    pub fn for_toolchain(toolchain: Toolchain) -> Self {
        let mut fortran_flags: Vec<String> = BASE_FFLAGS.iter().map(|s| s.to_string()).collect();
        fortran_flags.extend(toolchain.fortran.extra_fflags().iter().map(|s| s.to_string()));
        if let Some(flag) = toolchain.fortran.integer_flag() {
            fortran_flags.push(flag.to_string());
        }

        let mut c_flags: Vec<String> = toolchain
            .fortran
            .extra_cflags()
            .iter()
            .map(|s| s.to_string())
            .collect();
        c_flags.push(C_INTEGER_FLAG.to_string());

        Self {
            name: BuildConfigName::default(),
            toolchain,
            archiver: ARCHIVER.to_string(),
            archiver_flags: "rv".to_string(),
            c_flags,
            vectorized_fortran_flags: fortran_flags.clone(),
            fortran_flags,
            archive_indexer: ARCHIVE_INDEXER.to_string(),
        }
    }

    /// Renders the key-value configuration file.
    pub fn render(&self) -> String {
        let c_flags = self.c_flags.join(" ");
        let fortran_flags = self.fortran_flags.join(" ");
        let vect_flags = self.vectorized_fortran_flags.join(" ");

        let mut out = String::new();
        out.push_str("#   Generic configuration file for linux.\n");
        out.push_str(&format!("AR         = {}\n", self.archiver));
        out.push_str(&format!("ARFLAGS    = {}\n", self.archiver_flags));
        out.push_str(&format!("CC         = {}\n", self.toolchain.c));
        out.push_str(&format!("CFLAGS     = -O {}\n", c_flags));
        out.push_str(&format!("FASTCFLAGS = {}\n", c_flags));
        out.push_str(&format!("FC         = {}\n", self.toolchain.fortran));
        out.push_str(&format!("FFLAGS     = {}\n", fortran_flags));
        out.push_str(&format!("VECTFFLAGS = {}\n", vect_flags));
        out.push_str(&format!("RANLIB     = {}\n", self.archive_indexer));
        out
    }

    /// Path of the configuration file inside a source tree.
    pub fn path_in(&self, source_dir: &Path) -> PathBuf {
        source_dir.join("config").join(self.name.file_name())
    }

    /// Writes the configuration into `source_dir/config`, replacing any
    /// existing file of the same name.
    pub fn write(&self, source_dir: &Path) -> InstallResult<PathBuf> {
        let path = self.path_in(source_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::write_failed(parent, e))?;
        }
        std::fs::write(&path, self.render()).map_err(|e| InstallError::write_failed(&path, e))?;
        debug!("wrote build configuration {}", path.display());
        Ok(path)
    }
}

/// Fortran compilers considered for selection under `config`.
fn fortran_candidates(config: &InstallConfig) -> Vec<FortranCompiler> {
    FORTRAN_PRIORITY
        .iter()
        .copied()
        .filter(|fc| config.enable_g95 || *fc != FortranCompiler::G95)
        .collect()
}

/// Selects the compiler pair from what `probe` reports as installed.
pub fn select_toolchain(probe: &dyn PathProbe, config: &InstallConfig) -> InstallResult<Toolchain> {
    let fortran_list = fortran_candidates(config);
    let fortran_names: Vec<&str> = fortran_list.iter().map(|fc| fc.command()).collect();
    let c_names: Vec<&str> = C_PRIORITY.iter().map(|cc| cc.command()).collect();

    let fortran_found = probe_all(probe, &fortran_names);
    let c_found = probe_all(probe, &c_names);
    for candidate in fortran_found.iter().chain(c_found.iter()) {
        debug!("{:<9} present = {}", candidate.name, candidate.present);
    }

    let fortran = fortran_list
        .iter()
        .zip(&fortran_found)
        .find(|(_, candidate)| candidate.present)
        .map(|(fc, _)| *fc)
        .ok_or_else(|| InstallError::NoFortranCompiler {
            searched: fortran_names.join(", "),
        })?;

    let c = C_PRIORITY
        .iter()
        .zip(&c_found)
        .find(|(_, candidate)| candidate.present)
        .map(|(cc, _)| *cc)
        .ok_or_else(|| InstallError::NoCCompiler {
            searched: c_names.join(", "),
        })?;

    Ok(Toolchain { fortran, c })
}

/// Probes the toolchain and synthesizes the build configuration.
pub fn synthesize(probe: &dyn PathProbe, config: &InstallConfig) -> InstallResult<BuildConfiguration> {
    let toolchain = select_toolchain(probe, config)?;
    info!("Using: {} as fortran compiler", toolchain.fortran);
    info!("Using: {} as c compiler", toolchain.c);
    Ok(BuildConfiguration::for_toolchain(toolchain))
}
