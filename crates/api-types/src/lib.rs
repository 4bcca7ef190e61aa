//! Shared node-pool type definitions
//!
//! This crate contains the serde data model shared by the node-pool
//! components: the user-facing [`NodePoolSpec`] read from YAML, and the
//! fully resolved [`NodePoolDescriptor`] handed to a provisioner.

mod descriptor;
mod spec;

pub use descriptor::*;
pub use spec::*;
