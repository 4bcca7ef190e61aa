//! Resolution and validation engine for GKE node pools.
//!
//! A [`api_types::NodePoolSpec`] is resolved into a [`api_types::NodePoolDescriptor`]
//! by [`domain::NodePoolDescriptorBuilder`], submitted through a
//! [`domain::NodePoolProvisioner`] and, for GPUDirect machine types, followed
//! by the workload patch and manifest apply steps of [`app::NodePoolDeployer`].

pub mod app;
pub mod config;
pub mod domain;
pub mod infrastructure;
