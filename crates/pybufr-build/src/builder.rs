//! Building `libbufr.a` and publishing it in the work directory.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::acquire::SourceTree;
use crate::config::{InstallConfig, LIBRARY_FILE};
use crate::configure::BuildConfiguration;
use crate::error::{InstallError, InstallResult};
use crate::runner::{execute, CommandRunner, ToolCommand};

/// The built static library and its published alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticArchive {
    /// The archive inside the source tree (owned by the build).
    pub path: PathBuf,
    /// Symlink in the work directory pointing at `path`.
    pub link: PathBuf,
}

impl StaticArchive {
    /// Directory to pass to the linker as a search path.
    pub fn link_dir(&self) -> &Path {
        self.link.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Runs the BUFR makefiles with the synthesized configuration.
pub fn build(
    tree: &SourceTree,
    build_config: &BuildConfiguration,
    config: &InstallConfig,
    runner: &dyn CommandRunner,
) -> InstallResult<()> {
    let command = ToolCommand::new(&config.make, &tree.source_dir).args(build_config.name.make_args());
    execute(runner, &command)?;
    Ok(())
}

/// Checks the build output and links it into the work directory.
///
/// Nothing is touched in the work directory unless the archive exists.
pub fn publish(tree: &SourceTree, config: &InstallConfig) -> InstallResult<StaticArchive> {
    let built = tree.source_dir.join(LIBRARY_FILE);
    if !built.is_file() {
        return Err(InstallError::LibraryNotBuilt { path: built });
    }
    info!("Build seems successful");

    let target = built
        .canonicalize()
        .map_err(|e| InstallError::read_failed(&built, e))?;
    let link = config.published_library();
    replace_link(&target, &link)?;
    debug!("published {} -> {}", link.display(), target.display());

    Ok(StaticArchive { path: built, link })
}

/// Removes whatever sits at `link` (including a dangling symlink) and
/// creates a fresh symlink to `target`.
fn replace_link(target: &Path, link: &Path) -> InstallResult<()> {
    let link_failed = |e| InstallError::LinkFailed {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source: e,
    };

    if std::fs::symlink_metadata(link).is_ok() {
        std::fs::remove_file(link).map_err(link_failed)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(link_failed)
    }
    #[cfg(not(unix))]
    {
        Err(link_failed(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symbolic links are only supported on unix",
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::acquire::SourceTree;

    fn tree_in(dir: &Path) -> SourceTree {
        let lib_dir = dir.join("ecmwf_bufr_lib");
        std::fs::create_dir_all(lib_dir.join("bufr_000380")).unwrap();
        SourceTree::from_archive(&lib_dir.join("bufr_000380.tar.gz")).unwrap()
    }

    #[test]
    fn test_publish_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_in(dir.path());
        let config = InstallConfig::with_work_dir(dir.path());

        let err = publish(&tree, &config).unwrap_err();
        assert!(matches!(err, InstallError::LibraryNotBuilt { .. }));
        assert!(std::fs::symlink_metadata(config.published_library()).is_err());
    }

    #[test]
    fn test_publish_replaces_stale_link() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_in(dir.path());
        let config = InstallConfig::with_work_dir(dir.path());

        std::fs::write(tree.source_dir.join(LIBRARY_FILE), b"!<arch>\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.a"), config.published_library()).unwrap();

        let archive = publish(&tree, &config).unwrap();
        assert_eq!(archive.link, config.published_library());
        assert_eq!(std::fs::read(&archive.link).unwrap(), b"!<arch>\n");
        assert_eq!(archive.link_dir(), dir.path());
    }
}
