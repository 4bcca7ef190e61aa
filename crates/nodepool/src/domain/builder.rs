//! Node pool descriptor builder.
//!
//! Runs every resolver over a [`NodePoolSpec`], collects all rule violations
//! and only then either produces a [`NodePoolDescriptor`] or returns the full
//! error set. A partially valid spec never yields a descriptor.

use api_types::ClusterRef;
use api_types::NodePoolDescriptor;
use api_types::NodePoolSpec;
use api_types::PlacementPolicy;
use api_types::ResolvedAccelerator;
use api_types::Taint;
use api_types::TaintEffect;
use api_types::UpgradeSettings;
use api_types::UpgradeStrategy;

use crate::config::tables::LookupTables;
use crate::domain::errors::ValidationError;
use crate::domain::errors::ValidationErrors;
use crate::domain::resolve::resolve_accelerators;
use crate::domain::resolve::resolve_local_ssd;
use crate::domain::resolve::resolve_reservation_affinity;
use crate::domain::resolve::resolve_scaling_mode;
use crate::domain::resolve::ScalingRequest;

/// Key of the taint added to every accelerator node pool.
pub const GPU_TAINT_KEY: &str = "nvidia.com/gpu";

/// Taint keeping non-GPU workloads off accelerator nodes.
pub fn gpu_taint() -> Taint {
    Taint {
        key: GPU_TAINT_KEY.to_string(),
        value: "present".to_string(),
        effect: TaintEffect::NoSchedule,
    }
}

/// Builds descriptors against a fixed set of lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct NodePoolDescriptorBuilder<'a> {
    tables: &'a LookupTables,
}

impl<'a> NodePoolDescriptorBuilder<'a> {
    pub fn new(tables: &'a LookupTables) -> Self {
        Self { tables }
    }

    /// Resolves and validates `spec`.
    ///
    /// # Errors
    ///
    /// - [`ValidationErrors`] holding every violated rule
    #[tracing::instrument(skip_all, fields(name = %spec.name, machine_type = %spec.machine_type))]
    pub fn build(&self, spec: &NodePoolSpec) -> Result<NodePoolDescriptor, ValidationErrors> {
        let mut errors = Vec::new();

        if spec.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        let cluster = parse_cluster_id(&spec.cluster_id).map_err(|e| errors.push(e)).ok();
        errors.extend(
            spec.zones
                .iter()
                .enumerate()
                .filter(|(_, zone)| zone.trim().is_empty())
                .map(|(index, _)| ValidationError::EmptyZone { index }),
        );

        let accelerators = resolve_accelerators(
            &spec.guest_accelerator,
            &spec.machine_type,
            &self.tables.accelerator_defaults,
        );
        errors.extend(check_accelerators(
            &accelerators.accelerators,
            &spec.machine_type,
        ));

        let local_ssd = resolve_local_ssd(
            spec.local_ssd_count_ephemeral_storage,
            spec.local_ssd_count_nvme_block,
        )
        .map_err(|e| errors.push(e))
        .ok();
        let reservation_affinity = resolve_reservation_affinity(&spec.reservation_affinity)
            .map_err(|e| errors.push(e))
            .ok();
        let scaling = resolve_scaling_mode(ScalingRequest::from(spec))
            .map_err(|e| errors.extend(e))
            .ok();

        errors.extend(check_upgrade_settings(&spec.upgrade_settings));
        errors.extend(check_placement_policy(&spec.placement_policy));

        let gpu_direct = self
            .tables
            .gpu_direct
            .resolve(&spec.machine_type, spec.gpu_direct_config.as_ref());

        ValidationErrors::check(errors).inspect_err(|errors| {
            tracing::warn!("node pool rejected with {} error(s)", errors.len());
        })?;

        // Every resolver succeeded when no error was recorded.
        let (Some(cluster), Some(local_ssd), Some(reservation_affinity), Some(scaling)) =
            (cluster, local_ssd, reservation_affinity, scaling)
        else {
            unreachable!("resolver failures are recorded as validation errors");
        };

        // The derived GPU taint is appended even when the user already
        // supplied an identical one.
        let mut taints = spec.taints.clone();
        if accelerators.has_gpu {
            taints.push(gpu_taint());
        }

        tracing::info!(?scaling, gpu = accelerators.has_gpu, "node pool resolved");

        Ok(NodePoolDescriptor {
            name: spec.name.clone(),
            cluster,
            machine_type: spec.machine_type.clone(),
            zones: spec.zones.clone(),
            disk_size_gb: spec.disk_size_gb,
            disk_type: spec.disk_type.clone(),
            service_account_email: spec.service_account_email.clone(),
            oauth_scopes: spec.service_account_scopes.clone(),
            image_type: spec.image_type.clone(),
            scaling,
            accelerators: accelerators.accelerators,
            taints,
            local_ssd,
            reservation_affinity,
            placement_policy: spec.placement_policy.clone(),
            host_maintenance_interval: spec.host_maintenance_interval,
            additional_networks: spec.additional_networks.clone(),
            upgrade_settings: spec.upgrade_settings,
            auto_upgrade: spec.auto_upgrade,
            spot: spec.spot,
            enable_gcfs: spec.enable_gcfs,
            enable_gvnic: spec.enable_gvnic,
            threads_per_core: spec.threads_per_core,
            kubernetes_labels: spec.kubernetes_labels.clone(),
            labels: spec.labels.clone(),
            timeouts: spec.timeouts.clone(),
            gpu_direct,
        })
    }
}

/// Parses `projects/{project}/locations/{location}/clusters/{cluster}`.
pub fn parse_cluster_id(cluster_id: &str) -> Result<ClusterRef, ValidationError> {
    let segments: Vec<&str> = cluster_id.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["projects", project, "locations", location, "clusters", cluster]
            if !project.is_empty() && !location.is_empty() && !cluster.is_empty() =>
        {
            Ok(ClusterRef {
                project: project.to_string(),
                location: location.to_string(),
                cluster: cluster.to_string(),
            })
        }
        _ => Err(ValidationError::InvalidClusterId {
            value: cluster_id.to_string(),
        }),
    }
}

fn check_accelerators(
    accelerators: &[ResolvedAccelerator],
    machine_type: &str,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (index, accelerator) in accelerators.iter().enumerate() {
        if accelerator.accelerator_type.is_empty() {
            errors.push(ValidationError::AcceleratorTypeUnresolved {
                index,
                machine_type: machine_type.to_string(),
            });
        }
        if accelerator.count == 0 {
            errors.push(ValidationError::AcceleratorCountUnresolved {
                index,
                machine_type: machine_type.to_string(),
            });
        }
    }
    errors
}

fn check_upgrade_settings(settings: &UpgradeSettings) -> Option<ValidationError> {
    let no_capacity = settings.max_surge == 0 && settings.max_unavailable == 0;
    (settings.strategy == UpgradeStrategy::Surge && no_capacity)
        .then_some(ValidationError::SurgeWithoutCapacity)
}

fn check_placement_policy(policy: &PlacementPolicy) -> Option<ValidationError> {
    (policy.policy_name.is_some() && policy.placement_type.is_none())
        .then_some(ValidationError::PlacementPolicyNameWithoutCompact)
}
