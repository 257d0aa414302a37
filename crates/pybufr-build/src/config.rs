//! Installer configuration.
//!
//! Every stage receives an explicit [`InstallConfig`]; there is no global
//! state. Defaults reproduce the conventional layout (`./ecmwf_bufr_lib`,
//! `./f2py_build/signatures.pyf`, `./ecmwfbufr.so`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InstallError, InstallResult};

/// Page listing the downloadable BUFR library versions.
pub const DEFAULT_LISTING_URL: &str =
    "http://www.ecmwf.int/products/data/software/download/bufr.html";

/// Site root that relative archive links are resolved against.
pub const DEFAULT_SITE_URL: &str = "http://www.ecmwf.int/";

/// Name of the static library produced by the BUFR build.
pub const LIBRARY_FILE: &str = "libbufr.a";

/// Which Fortran sources are handed to f2py.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    /// Every `*.F` file of the `bufrdc` directory.
    #[default]
    All,
    /// The hand-picked entry points only. Imports of the resulting module
    /// fail with an unresolved `_gfortran_concat_string`.
    Curated,
}

impl SourceSelection {
    /// Returns the string identifier for this selection.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelection::All => "all",
            SourceSelection::Curated => "curated",
        }
    }
}

/// Configuration for an installer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Directory holding the published library and extension module.
    pub work_dir: PathBuf,
    /// Name of the directory (inside `work_dir`) holding downloaded archives.
    pub lib_dir_name: String,
    /// Listing page scraped for available archives.
    pub listing_url: String,
    /// Site root prefixed to relative archive links.
    pub site_url: String,
    /// Python module name of the generated extension.
    pub module_name: String,
    /// f2py build directory (inside `work_dir`).
    pub build_dir_name: String,
    /// Signature file name (inside the f2py build directory).
    pub signatures_name: String,
    /// f2py executable.
    pub f2py: String,
    /// make executable.
    pub make: String,
    /// tar executable.
    pub tar: String,
    /// Let g95 take part in compiler selection.
    pub enable_g95: bool,
    /// Fortran sources passed to f2py.
    pub sources: SourceSelection,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            lib_dir_name: "ecmwf_bufr_lib".to_string(),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            module_name: "ecmwfbufr".to_string(),
            build_dir_name: "f2py_build".to_string(),
            signatures_name: "signatures.pyf".to_string(),
            f2py: "f2py".to_string(),
            make: "make".to_string(),
            tar: "tar".to_string(),
            enable_g95: false,
            sources: SourceSelection::All,
        }
    }
}

impl InstallConfig {
    /// Creates a new config rooted at the given work directory.
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    /// Loads a config from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> InstallResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| InstallError::read_failed(path, e))?;
        serde_json::from_str(&content).map_err(|e| InstallError::ConfigParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Applies `PYBUFR_WORK_DIR`, `PYBUFR_LISTING_URL` and `PYBUFR_F2PY`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("PYBUFR_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("PYBUFR_LISTING_URL") {
            self.listing_url = url;
        }
        if let Ok(f2py) = std::env::var("PYBUFR_F2PY") {
            self.f2py = f2py;
        }
        self
    }

    /// Sets the listing page URL.
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    /// Sets the site root URL.
    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = url.into();
        self
    }

    /// Sets the source selection.
    pub fn sources(mut self, sources: SourceSelection) -> Self {
        self.sources = sources;
        self
    }

    /// Enables or disables g95 in compiler selection.
    pub fn enable_g95(mut self, enable: bool) -> Self {
        self.enable_g95 = enable;
        self
    }

    /// Directory holding downloaded archives and extracted sources.
    pub fn lib_dir(&self) -> PathBuf {
        self.work_dir.join(&self.lib_dir_name)
    }

    /// Location of the published `libbufr.a` link.
    pub fn published_library(&self) -> PathBuf {
        self.work_dir.join(LIBRARY_FILE)
    }

    /// The f2py build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.work_dir.join(&self.build_dir_name)
    }

    /// Full path of the generated signature file.
    pub fn signatures_path(&self) -> PathBuf {
        self.build_dir().join(&self.signatures_name)
    }
}
