//! Signature file post-processing.
//!
//! f2py does not follow the `#include`s that define the library's array
//! bounds, so the generated signatures refer to names like `jelem` that the
//! extension compiler cannot resolve. Those names are replaced by the values
//! from the library's `parameter.F`.
//!
//! Only lines containing `dimension` are rewritten, and only whole
//! identifiers inside parentheses:
//!
//! ```text
//! integer dimension(jelem,jsubs) :: kvals   ->   integer dimension(320000,400) :: kvals
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info};
use regex::bytes::{Captures, Regex};
use serde::Serialize;

use crate::error::{InstallError, InstallResult};

/// Array bounds from the library's `parameter.F`.
pub const BUFR_DIMENSIONS: &[(&str, u64)] = &[
    ("JSUP", 9),
    ("JSEC0", 3),
    ("JSEC1", 40),
    ("JSEC2", 4096),
    ("JSEC3", 4),
    ("JSEC4", 2),
    ("JELEM", 320000),
    ("JSUBS", 400),
    ("JCVAL", 150),
    ("JBUFL", 512000),
    ("JBPW", 32),
    ("JTAB", 3000),
    ("JCTAB", 3000),
    ("JCTST", 9000),
    ("JCTEXT", 9000),
    ("JWORK", 4096000),
    ("JKEY", 46),
    ("JTMAX", 10),
    ("JTCLAS", 64),
    ("JTEL", 255),
];

/// Marker selecting the lines that are rewritten.
const DIMENSION_TOKEN: &str = "dimension";

/// Suffix of the pre-patch backup copy.
pub const BACKUP_SUFFIX: &str = ".bak";

fn parenthesized_group() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?-u)\([^()]*\)").expect("group pattern is valid"))
}

fn identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?-u)[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid")
    })
}

fn has_dimension_token(line: &[u8]) -> bool {
    line.windows(DIMENSION_TOKEN.len())
        .any(|window| window == DIMENSION_TOKEN.as_bytes())
}

/// Symbolic dimension names and their literal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantTable {
    entries: Vec<(String, u64)>,
}

impl Default for ConstantTable {
    fn default() -> Self {
        Self::bufr()
    }
}

impl ConstantTable {
    /// The BUFR library's array bounds.
    pub fn bufr() -> Self {
        Self::from_pairs(BUFR_DIMENSIONS.iter().copied())
    }

    /// Builds a table from (name, value) pairs. Names are matched lower-cased.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, value)| (name.to_lowercase(), value))
                .collect(),
        }
    }

    /// Value for a lower-cased name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| *value)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrites one line. Returns the line unchanged (borrowed) when it has no
/// `dimension` token or nothing to substitute.
///
/// Works on raw bytes: descriptors may carry non-UTF-8 comments, which pass
/// through untouched.
pub fn patch_line<'a>(line: &'a [u8], table: &ConstantTable) -> (Cow<'a, [u8]>, usize) {
    if !has_dimension_token(line) {
        return (Cow::Borrowed(line), 0);
    }

    let mut count = 0;
    let patched = parenthesized_group().replace_all(line, |group: &Captures| {
        identifier()
            .replace_all(&group[0], |ident: &Captures| {
                let value = std::str::from_utf8(&ident[0])
                    .ok()
                    .and_then(|name| table.get(name));
                match value {
                    Some(value) => {
                        count += 1;
                        value.to_string().into_bytes()
                    }
                    None => ident[0].to_vec(),
                }
            })
            .into_owned()
    });

    if count == 0 {
        (Cow::Borrowed(line), 0)
    } else {
        (Cow::Owned(patched.into_owned()), count)
    }
}

/// Rewrites a whole descriptor, preserving line endings.
pub fn patch_text(text: &[u8], table: &ConstantTable) -> (Vec<u8>, PatchStats) {
    let mut out = Vec::with_capacity(text.len());
    let mut stats = PatchStats::default();

    for line in text.split_inclusive(|byte| *byte == b'\n') {
        let (patched, count) = patch_line(line, table);
        stats.lines_total += 1;
        if count > 0 {
            stats.lines_changed += 1;
            stats.substitutions += count;
            debug!("adapted line: {}", String::from_utf8_lossy(&patched).trim_end());
        }
        out.extend_from_slice(&patched);
    }

    (out, stats)
}

/// Line and substitution counts of a patch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatchStats {
    pub lines_total: usize,
    pub lines_changed: usize,
    pub substitutions: usize,
}

/// Result of patching a descriptor file in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    /// The patched file.
    pub path: PathBuf,
    /// Unmodified copy of the original.
    pub backup: PathBuf,
    #[serde(flatten)]
    pub stats: PatchStats,
}

/// Path of the backup copy for `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Patches a descriptor file in place, keeping a byte-identical backup.
///
/// An existing backup is kept as is, so it always holds the descriptor as
/// f2py first wrote it.
pub fn patch_file(path: &Path, table: &ConstantTable) -> InstallResult<PatchSummary> {
    let original = std::fs::read(path).map_err(|e| InstallError::read_failed(path, e))?;

    let backup = backup_path(path);
    if backup.exists() {
        debug!("keeping existing backup {}", backup.display());
    } else {
        std::fs::write(&backup, &original).map_err(|e| InstallError::write_failed(&backup, e))?;
    }

    let (patched, stats) = patch_text(&original, table);
    std::fs::write(path, patched).map_err(|e| InstallError::write_failed(path, e))?;

    info!(
        "patched {}: {} substitutions on {} of {} lines",
        path.display(),
        stats.substitutions,
        stats.lines_changed,
        stats.lines_total
    );

    Ok(PatchSummary {
        path: path.to_path_buf(),
        backup,
        stats,
    })
}
