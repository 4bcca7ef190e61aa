//! Application layer
//!
//! Wires the resolution engine to the provisioner and manifest applier.

pub mod deployment;

pub use deployment::DeploymentError;
pub use deployment::DeploymentOutcome;
pub use deployment::NodePoolDeployer;
