//! Pipeline tests with scripted tools.
//!
//! The fake runner imitates the side effects of `tar`, `make` and `f2py` on
//! a temporary work directory, and the fake fetcher serves a fixed listing
//! page, so the whole installer runs without network or toolchain.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pybufr-build --test pipeline
//! ```

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use pybufr_build::error::{FailureKind, InstallError, InstallResult};
use pybufr_build::{
    CommandRunner, Fetcher, FixedProbe, InstallConfig, Installer, Stage, ToolCommand, ToolOutcome,
};

const LISTING: &str = r#"<TABLE>
<TD WIDTH="37%"><A HREF="/software_files/bufr_000370.tar.gz" class="sowtware">bufr_000370.tar.gz</A> 02.03.2009</TD>
<TD WIDTH="37%"><A HREF="/software_files/bufr_000380.tar.gz" class="sowtware">bufr_000380.tar.gz</A> 28.07.2009</TD>
<TD WIDTH="37%"><A HREF="/software_files/bufr_000290.tar.gz" class="sowtware">bufr_000290.tar.gz</A> 01.01.2011</TD>
</TABLE>
"#;

const SIGNATURES: &str = "\
!    -*- f90 -*-
python module ecmwfbufr ! in
    interface  ! in :ecmwfbufr
        subroutine bufrex(kbuflen,kbuff,ksup,ksec0,values,cvals) ! in :ecmwfbufr:bufrex.F
            integer dimension(jsup),intent(inout) :: ksup
            integer dimension(jsec0),intent(inout) :: ksec0
            real*8 dimension(jelem,jsubs) :: values
            character*80 dimension(jcval) :: cvals
            integer :: kbuflen
        end subroutine bufrex
    end interface
end python module ecmwfbufr
";

/// Fetcher serving `LISTING` and a dummy archive body.
#[derive(Default)]
struct FakeFetcher {
    fail: bool,
    requests: RefCell<Vec<String>>,
}

impl Fetcher for FakeFetcher {
    fn fetch_text(&self, url: &str) -> InstallResult<String> {
        self.requests.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(InstallError::fetch_failed(url, "connection refused"));
        }
        Ok(LISTING.to_string())
    }

    fn fetch_to(&self, url: &str, dest: &mut dyn Write) -> InstallResult<u64> {
        self.requests.borrow_mut().push(url.to_string());
        dest.write_all(b"\x1f\x8b fake archive")
            .map_err(|e| InstallError::fetch_failed(url, e))?;
        Ok(16)
    }
}

/// Runner imitating the external tools.
#[derive(Default)]
struct ScriptedRunner {
    make_builds_library: bool,
    /// Number of upcoming `f2py -c` runs that produce no module.
    failing_links: Cell<u32>,
    commands: RefCell<Vec<ToolCommand>>,
}

impl ScriptedRunner {
    fn working() -> Self {
        Self {
            make_builds_library: true,
            ..Default::default()
        }
    }

    fn programs(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(|c| match c.args.iter().find(|a| *a == "-h" || *a == "-c") {
                Some(flag) => format!("{} {}", c.program, flag),
                None => c.program.clone(),
            })
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &ToolCommand) -> InstallResult<ToolOutcome> {
        self.commands.borrow_mut().push(command.clone());
        let cwd = &command.cwd;

        match command.program.as_str() {
            "tar" => {
                let name = command.args.last().unwrap();
                let dir = cwd.join(name.trim_end_matches(".tar.gz"));
                std::fs::create_dir_all(dir.join("config")).unwrap();
                std::fs::create_dir_all(dir.join("bufrdc")).unwrap();
                for source in ["bufrex.F", "bufren.F", "buxdes.F"] {
                    std::fs::write(dir.join("bufrdc").join(source), "      END\n").unwrap();
                }
            }
            "make" => {
                if self.make_builds_library {
                    std::fs::write(cwd.join("libbufr.a"), b"!<arch>\n").unwrap();
                }
            }
            "f2py" if command.args.iter().any(|a| a == "-h") => {
                // f2py refuses to overwrite an existing signature file.
                let build_dir = cwd.join("f2py_build");
                std::fs::create_dir_all(&build_dir).unwrap();
                let signatures = build_dir.join("signatures.pyf");
                if !signatures.exists() {
                    std::fs::write(signatures, SIGNATURES).unwrap();
                }
            }
            "f2py" if command.args.iter().any(|a| a == "-c") => {
                let failing = self.failing_links.get();
                if failing > 0 {
                    self.failing_links.set(failing - 1);
                } else {
                    std::fs::write(cwd.join("ecmwfbufr.so"), b"\x7fELF").unwrap();
                }
            }
            _ => {}
        }

        Ok(ToolOutcome {
            success: true,
            code: Some(0),
        })
    }
}

fn config_in(dir: &Path) -> InstallConfig {
    InstallConfig::with_work_dir(dir).site_url("http://bufr.test/")
}

fn installed() -> FixedProbe {
    FixedProbe::new(["g77", "gfortran", "gcc", "cc"])
}

#[test]
fn test_existing_module_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ecmwfbufr.so"), b"").unwrap();

    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    let fetcher = FakeFetcher::default();
    let probe = FixedProbe::default();

    let report = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap();

    assert!(report.already_installed);
    assert_eq!(report.stage, Stage::Ready);
    assert!(fetcher.requests.borrow().is_empty());
    assert!(runner.commands.borrow().is_empty());
}

#[test]
fn test_full_install_from_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    let fetcher = FakeFetcher::default();
    let probe = installed();

    let report = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap();

    assert_eq!(report.stage, Stage::Ready);
    assert!(!report.already_installed);
    assert_eq!(
        *fetcher.requests.borrow(),
        vec![
            config.listing_url.clone(),
            "http://bufr.test/software_files/bufr_000380.tar.gz".to_string(),
        ]
    );
    assert_eq!(runner.programs(), vec!["tar", "make", "f2py -h", "f2py -c"]);

    // Archive chosen by name, not by date.
    let source = report.source.as_ref().unwrap();
    assert_eq!(source.archive_name, "bufr_000380.tar.gz");

    // Configuration selected gfortran over g77.
    let config_file = source.source_dir.join("config/config.linux_compiler");
    let content = std::fs::read_to_string(&config_file).unwrap();
    assert!(content.contains("FC         = gfortran\n"));
    assert!(content.contains("FFLAGS     = -O -Dlinux -fno-second-underscore -fPIC\n"));
    assert!(content.contains("CC         = gcc\n"));

    // make received the configuration tags.
    let make = runner.commands.borrow()[1].clone();
    assert_eq!(make.args, vec!["ARCH=linux", "CNAME=_compiler", "R64=", "A64="]);
    assert_eq!(make.cwd, source.source_dir);

    // Published library is a symlink into the source tree.
    let link = dir.path().join("libbufr.a");
    assert!(std::fs::symlink_metadata(&link)
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(std::fs::read(&link).unwrap(), b"!<arch>\n");

    // Signatures patched with a pristine backup.
    let signatures = dir.path().join("f2py_build/signatures.pyf");
    let patched = std::fs::read_to_string(&signatures).unwrap();
    assert!(patched.contains("real*8 dimension(320000,400) :: values"));
    assert!(patched.contains("integer dimension(9),intent(inout) :: ksup"));
    assert!(patched.contains("character*80 dimension(150) :: cvals"));
    assert!(patched.contains("            integer :: kbuflen\n"));
    let backup = std::fs::read_to_string(dir.path().join("f2py_build/signatures.pyf.bak")).unwrap();
    assert_eq!(backup, SIGNATURES);

    let summary = report.patch.as_ref().unwrap();
    assert_eq!(summary.stats.lines_changed, 4);
    assert_eq!(summary.stats.substitutions, 5);

    // Extension linked against the work directory.
    let link_cmd = runner.commands.borrow()[3].clone();
    assert_eq!(
        link_cmd.args,
        vec!["f2py_build/signatures.pyf", "-L.", "-lbufr", "-c"]
    );
    assert_eq!(report.module, Some(dir.path().join("ecmwfbufr.so")));
}

#[test]
fn test_missing_library_after_build_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let runner = ScriptedRunner::default();
    let fetcher = FakeFetcher::default();
    let probe = installed();

    let failure = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap_err();

    assert!(matches!(failure.error, InstallError::LibraryNotBuilt { .. }));
    assert_eq!(failure.error.kind(), FailureKind::ArtifactMissing);
    assert_eq!(failure.stage, Stage::Configured);
    assert!(std::fs::symlink_metadata(dir.path().join("libbufr.a")).is_err());
    assert_eq!(runner.programs(), vec!["tar", "make"]);
}

#[test]
fn test_no_fortran_compiler_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    let fetcher = FakeFetcher::default();
    let probe = FixedProbe::new(["gcc"]);

    let failure = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap_err();

    assert!(matches!(
        failure.error,
        InstallError::NoFortranCompiler { .. }
    ));
    assert_eq!(failure.error.kind(), FailureKind::EnvironmentMissing);
    assert_eq!(failure.stage, Stage::Acquired);
    let config_file = dir
        .path()
        .join("ecmwf_bufr_lib/bufr_000380/config/config.linux_compiler");
    assert!(!config_file.exists());
    assert_eq!(runner.programs(), vec!["tar"]);
}

#[test]
fn test_network_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    let fetcher = FakeFetcher {
        fail: true,
        ..Default::default()
    };
    let probe = installed();

    let failure = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap_err();

    assert_eq!(failure.error.kind(), FailureKind::NetworkFailure);
    assert_eq!(failure.stage, Stage::NeedAcquire);
    assert_eq!(fetcher.requests.borrow().len(), 1);
    assert!(runner.commands.borrow().is_empty());
}

#[test]
fn test_local_archive_and_unpacked_tree_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let lib_dir = dir.path().join("ecmwf_bufr_lib");
    let source = lib_dir.join("bufr_000380");
    std::fs::create_dir_all(source.join("bufrdc")).unwrap();
    std::fs::write(source.join("bufrdc/bufrex.F"), "      END\n").unwrap();
    std::fs::write(lib_dir.join("bufr_000380.tar.gz"), b"").unwrap();

    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    let fetcher = FakeFetcher::default();
    let probe = installed();

    let report = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap();

    assert_eq!(report.stage, Stage::Ready);
    assert!(fetcher.requests.borrow().is_empty());
    assert_eq!(runner.programs(), vec!["make", "f2py -h", "f2py -c"]);
}

#[test]
fn test_published_library_skips_build() {
    let dir = tempfile::tempdir().unwrap();
    let lib_dir = dir.path().join("ecmwf_bufr_lib");
    let source = lib_dir.join("bufr_000380");
    std::fs::create_dir_all(source.join("bufrdc")).unwrap();
    std::fs::write(source.join("bufrdc/bufrex.F"), "      END\n").unwrap();
    std::fs::write(lib_dir.join("bufr_000380.tar.gz"), b"").unwrap();
    std::fs::write(dir.path().join("libbufr.a"), b"!<arch>\n").unwrap();

    let config = config_in(dir.path());
    let runner = ScriptedRunner::default();
    let fetcher = FakeFetcher::default();
    let probe = FixedProbe::default();

    let report = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap();

    assert!(report.library_reused);
    assert!(report.build_config.is_none());
    assert_eq!(report.stage, Stage::Ready);
    assert_eq!(runner.programs(), vec!["f2py -h", "f2py -c"]);
}

#[test]
fn test_rerun_after_failed_link_keeps_pristine_backup() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let runner = ScriptedRunner::working();
    runner.failing_links.set(1);
    let fetcher = FakeFetcher::default();
    let probe = installed();

    let failure = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Bound);
    assert_eq!(failure.error.code(), "PYBUFR_010");

    runner.commands.borrow_mut().clear();
    let report = Installer::new(&config, &probe, &runner, &fetcher)
        .run()
        .unwrap();

    assert_eq!(report.stage, Stage::Ready);
    assert!(report.library_reused);
    assert!(report.bindings_reused);
    assert!(report.patch.is_none());
    assert_eq!(runner.programs(), vec!["f2py -c"]);

    let signatures = config.signatures_path();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("f2py_build/signatures.pyf.bak")).unwrap(),
        SIGNATURES
    );
    let patched = std::fs::read_to_string(&signatures).unwrap();
    assert!(patched.contains("integer dimension(9),intent(inout) :: ksup"));
    assert!(patched.contains("real*8 dimension(320000,400) :: values"));
}
