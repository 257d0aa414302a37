//! Toolchain presence probing.

use std::collections::BTreeSet;

use log::debug;

/// Answers whether a command resolves on the executable search path.
///
/// Absence is a normal outcome, never an error.
pub trait PathProbe {
    /// Returns true if `command` is found on the search path.
    fn is_present(&self, command: &str) -> bool;
}

/// Probe backed by the `which` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhichProbe;

impl PathProbe for WhichProbe {
    fn is_present(&self, command: &str) -> bool {
        match which::which(command) {
            Ok(path) => {
                debug!("found {} at {}", command, path.display());
                true
            }
            Err(_) => {
                debug!("{} not found on PATH", command);
                false
            }
        }
    }
}

/// Probe answering from a fixed set of installed command names.
#[derive(Debug, Clone, Default)]
pub struct FixedProbe {
    installed: BTreeSet<String>,
}

impl FixedProbe {
    /// Creates a probe that reports exactly `installed` as present.
    pub fn new<I, S>(installed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: installed.into_iter().map(Into::into).collect(),
        }
    }
}

impl PathProbe for FixedProbe {
    fn is_present(&self, command: &str) -> bool {
        self.installed.contains(command)
    }
}

/// Result of probing a single command.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ToolchainCandidate {
    /// Command name that was probed.
    pub name: String,
    /// Whether it resolved on the search path.
    pub present: bool,
}

/// Probes every name in `names`, in order.
pub fn probe_all(probe: &dyn PathProbe, names: &[&str]) -> Vec<ToolchainCandidate> {
    names
        .iter()
        .map(|name| {
            debug!("checking for presence of command: {}", name);
            ToolchainCandidate {
                name: (*name).to_string(),
                present: probe.is_present(name),
            }
        })
        .collect()
}
