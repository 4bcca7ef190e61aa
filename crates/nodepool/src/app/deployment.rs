use std::error::Error;
use std::path::PathBuf;

use api_types::NodePoolDescriptor;
use api_types::NodePoolSpec;
use error_stack::Report;
use error_stack::ResultExt;
use tracing::info;
use tracing::warn;

use crate::config::tables::LookupTables;
use crate::domain::ApplyTarget;
use crate::domain::ManifestApplier;
use crate::domain::ManifestSource;
use crate::domain::NodePoolDescriptorBuilder;
use crate::domain::NodePoolProvisioner;
use crate::domain::ProvisionedNodePool;
use crate::domain::WorkloadPatcher;

/// Failure of one deployment step
#[derive(Debug, derive_more::Display)]
pub enum DeploymentError {
    #[display("Node pool specification is invalid")]
    InvalidSpec,
    #[display("Node pool provisioning failed")]
    Provisioning,
    #[display("GPUDirect workload patch failed")]
    WorkloadPatch,
    #[display("Applying GPUDirect manifests failed")]
    ManifestApply,
}

impl Error for DeploymentError {}

/// Result of a successful deployment
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub descriptor: NodePoolDescriptor,
    pub node_pool: ProvisionedNodePool,
    /// Patched copy of the user workload, if one was written
    pub patched_workload: Option<PathBuf>,
    /// Manifests handed to the applier, in order
    pub applied_manifests: Vec<ManifestSource>,
}

/// Runs resolve, provision, patch and apply for one node pool spec
pub struct NodePoolDeployer<P, A> {
    tables: LookupTables,
    provisioner: P,
    applier: A,
}

impl<P, A> NodePoolDeployer<P, A>
where
    P: NodePoolProvisioner,
    A: ManifestApplier,
{
    pub fn new(tables: LookupTables, provisioner: P, applier: A) -> Self {
        Self {
            tables,
            provisioner,
            applier,
        }
    }

    /// Deploys the node pool described by `spec`.
    ///
    /// Nothing is sent to the provider when the spec is invalid. The workload
    /// patch and manifest apply steps only run for GPUDirect machine types,
    /// strictly after the provider accepted the node pool.
    ///
    /// # Errors
    ///
    /// - [`DeploymentError::InvalidSpec`] carrying every validation error
    /// - [`DeploymentError::Provisioning`] if the provisioner fails
    /// - [`DeploymentError::WorkloadPatch`] if the user workload cannot be patched
    /// - [`DeploymentError::ManifestApply`] if applying the manifests fails
    #[tracing::instrument(skip_all, fields(node_pool = %spec.name))]
    pub async fn deploy(
        &self,
        spec: &NodePoolSpec,
    ) -> Result<DeploymentOutcome, Report<DeploymentError>> {
        let descriptor = NodePoolDescriptorBuilder::new(&self.tables)
            .build(spec)
            .map_err(|errors| Report::new(errors).change_context(DeploymentError::InvalidSpec))?;

        let node_pool = self
            .provisioner
            .provision(&descriptor)
            .await
            .change_context(DeploymentError::Provisioning)?;
        info!("node pool {} accepted as {}", descriptor.name, node_pool.id);

        let mut outcome = DeploymentOutcome {
            descriptor,
            node_pool,
            patched_workload: None,
            applied_manifests: Vec::new(),
        };

        let Some(patcher) = WorkloadPatcher::from_setting(&outcome.descriptor.gpu_direct) else {
            return Ok(outcome);
        };

        let source = spec
            .gpu_direct_config
            .as_ref()
            .and_then(|config| config.user_workload_path.as_deref());
        match (source, outcome.descriptor.gpu_direct.workload_path.as_deref()) {
            (Some(source), Some(destination)) => {
                patcher
                    .patch_file(source, destination)
                    .await
                    .change_context(DeploymentError::WorkloadPatch)?;
                outcome.patched_workload = Some(destination.to_path_buf());
            }
            _ => warn!(
                "machine type {} uses GPUDirect but no user_workload_path is set, skipping workload patch",
                outcome.descriptor.machine_type
            ),
        }

        let mut sources: Vec<ManifestSource> = outcome
            .descriptor
            .gpu_direct
            .manifest_paths
            .iter()
            .map(|path| ManifestSource::parse(path))
            .collect();
        if let Some(patched) = &outcome.patched_workload {
            sources.push(ManifestSource::from(patched.as_path()));
        }

        let target = ApplyTarget::from(&outcome.descriptor.cluster);
        self.applier
            .apply(&target, &sources)
            .await
            .change_context(DeploymentError::ManifestApply)?;
        info!("applied {} manifest(s) to {}", sources.len(), target.cluster);

        outcome.applied_manifests = sources;
        Ok(outcome)
    }
}
