//! Compiling and linking the Python extension module.

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::bindgen::InterfaceDescriptor;
use crate::builder::StaticArchive;
use crate::config::InstallConfig;
use crate::error::{InstallError, InstallResult};
use crate::runner::{execute, CommandRunner, ToolCommand};

/// The loadable extension module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionModule {
    pub path: PathBuf,
}

/// Looks for `<module>.so` or an ABI-tagged `<module>.*.so` in `dir`.
pub fn find_module(dir: &Path, module_name: &str) -> Option<PathBuf> {
    let plain = dir.join(format!("{}.so", module_name));
    if plain.is_file() {
        return Some(plain);
    }

    let pattern = format!(
        "{}/{}.*.so",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(module_name)
    );
    let mut tagged: Vec<PathBuf> = glob::glob(&pattern)
        .ok()?
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .collect();
    tagged.sort();
    tagged.pop()
}

/// Compiles the patched descriptor against the published library.
pub fn link(
    descriptor: &InterfaceDescriptor,
    archive: &StaticArchive,
    config: &InstallConfig,
    runner: &dyn CommandRunner,
) -> InstallResult<ExtensionModule> {
    let descriptor_arg = descriptor
        .path
        .strip_prefix(&config.work_dir)
        .unwrap_or(descriptor.path.as_path());
    let library_dir = archive.link_dir();
    let library_dir = library_dir
        .strip_prefix(&config.work_dir)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let command = ToolCommand::new(&config.f2py, &config.work_dir)
        .path_arg(descriptor_arg)
        .arg(format!("-L{}", library_dir.display()))
        .arg("-lbufr")
        .arg("-c");
    execute(runner, &command)?;

    match find_module(&config.work_dir, &descriptor.module_name) {
        Some(path) => {
            info!("a python wrapper to the ECMWF BUFR library has been generated");
            Ok(ExtensionModule { path })
        }
        None => Err(InstallError::ModuleNotBuilt {
            module: descriptor.module_name.clone(),
            dir: config.work_dir.clone(),
        }),
    }
}
