//! Shared helpers for the node-pool workspace: logging bootstrap and build
//! version information.

pub mod logging;
pub mod version;
