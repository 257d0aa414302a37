//! pybufr command-line front end.
//!
//! Exposes the command implementations so integration tests can drive them
//! without spawning the binary.

pub mod commands;
pub mod settings;
