//! Command layer - entry points of the `nodepool` subcommands

pub mod patch;
pub mod provision;
pub mod resolve;

pub use patch::run_patch_workload;
pub use provision::run_provision;
pub use resolve::run_resolve;
