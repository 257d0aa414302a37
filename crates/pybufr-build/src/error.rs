//! Error types for the BUFR installer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Coarse classification of a fatal installer condition.
///
/// The top-level driver maps each kind to a terminal report; the pipeline
/// itself never exits the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required tool (compiler, f2py, tar, make) is not available.
    EnvironmentMissing,
    /// The listing page or the archive could not be fetched.
    NetworkFailure,
    /// An external tool ran but its expected output file is absent.
    ArtifactMissing,
    /// A local filesystem operation failed.
    Filesystem,
}

impl FailureKind {
    /// Returns the string identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::EnvironmentMissing => "environment",
            FailureKind::NetworkFailure => "network",
            FailureKind::ArtifactMissing => "artifact",
            FailureKind::Filesystem => "filesystem",
        }
    }
}

/// Errors that can occur while installing the library or its wrapper.
#[derive(Debug, Error)]
pub enum InstallError {
    /// No Fortran compiler found on the search path.
    #[error("No suitable fortran compiler found (looked for: {searched})")]
    NoFortranCompiler { searched: String },

    /// No C compiler found on the search path.
    #[error("No suitable c compiler found (looked for: {searched})")]
    NoCCompiler { searched: String },

    /// An external tool could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A page or archive could not be fetched.
    #[error("Could not open url {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// The listing page did not mention any archive.
    #[error("No library archives listed at {url}")]
    NoArchivesListed { url: String },

    /// No local archive found even after a download.
    #[error("No library archive found in {dir}")]
    ArchiveNotFound { dir: PathBuf },

    /// Extraction did not produce the expected source directory.
    #[error("Unpacking {archive} did not produce {dir}")]
    SourcesNotExtracted { archive: PathBuf, dir: PathBuf },

    /// The static library was not produced by the build.
    #[error("No libbufr.a file seems generated (expected {path})")]
    LibraryNotBuilt { path: PathBuf },

    /// No Fortran sources were found to extract signatures from.
    #[error("No fortran sources found matching {pattern}")]
    NoSources { pattern: String },

    /// The signature file was not produced by f2py.
    #[error("The signatures file could not be found: {path}")]
    SignaturesNotGenerated { path: PathBuf },

    /// The extension module was not produced by the compile/link step.
    #[error("The compilation or linking stage failed, no {module} module found in {dir}")]
    ModuleNotBuilt { module: String, dir: PathBuf },

    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or create a file or directory.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to replace the published library link.
    #[error("Failed to publish {link} -> {target}: {source}")]
    LinkFailed {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid glob pattern built from a configured path.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InstallError {
    /// Creates a new fetch failed error.
    pub fn fetch_failed(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates a new read failed error.
    pub fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates a new write failed error.
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    /// Returns the failure classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            InstallError::NoFortranCompiler { .. }
            | InstallError::NoCCompiler { .. }
            | InstallError::SpawnFailed { .. } => FailureKind::EnvironmentMissing,
            InstallError::FetchFailed { .. } | InstallError::NoArchivesListed { .. } => {
                FailureKind::NetworkFailure
            }
            InstallError::ArchiveNotFound { .. }
            | InstallError::SourcesNotExtracted { .. }
            | InstallError::LibraryNotBuilt { .. }
            | InstallError::NoSources { .. }
            | InstallError::SignaturesNotGenerated { .. }
            | InstallError::ModuleNotBuilt { .. } => FailureKind::ArtifactMissing,
            InstallError::ReadFailed { .. }
            | InstallError::WriteFailed { .. }
            | InstallError::LinkFailed { .. }
            | InstallError::InvalidPattern { .. }
            | InstallError::ConfigParseFailed { .. } => FailureKind::Filesystem,
        }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            InstallError::NoFortranCompiler { .. } => "PYBUFR_001",
            InstallError::NoCCompiler { .. } => "PYBUFR_002",
            InstallError::SpawnFailed { .. } => "PYBUFR_003",
            InstallError::FetchFailed { .. } => "PYBUFR_004",
            InstallError::NoArchivesListed { .. } => "PYBUFR_005",
            InstallError::ArchiveNotFound { .. } => "PYBUFR_006",
            InstallError::LibraryNotBuilt { .. } => "PYBUFR_007",
            InstallError::NoSources { .. } => "PYBUFR_008",
            InstallError::SignaturesNotGenerated { .. } => "PYBUFR_009",
            InstallError::ModuleNotBuilt { .. } => "PYBUFR_010",
            InstallError::ReadFailed { .. } => "PYBUFR_011",
            InstallError::WriteFailed { .. } => "PYBUFR_012",
            InstallError::LinkFailed { .. } => "PYBUFR_013",
            InstallError::InvalidPattern { .. } => "PYBUFR_014",
            InstallError::ConfigParseFailed { .. } => "PYBUFR_015",
            InstallError::SourcesNotExtracted { .. } => "PYBUFR_016",
        }
    }
}
