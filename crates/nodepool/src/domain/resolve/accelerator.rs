use api_types::AcceleratorRequest;
use api_types::GpuDriverVersion;
use api_types::ResolvedAccelerator;

use crate::config::tables::AcceleratorDefaults;

/// Finalized accelerators of a node pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorResolution {
    pub accelerators: Vec<ResolvedAccelerator>,
    pub has_gpu: bool,
}

/// Fills unset accelerator fields from the machine type's defaults.
///
/// An empty `type` or a zero `count` counts as unset. Without a default
/// entry the field stays empty/zero; rejecting such entries is left to the
/// descriptor builder. An empty request list on a machine type with a default
/// entry yields one accelerator built from that entry.
pub fn resolve_accelerators(
    requests: &[AcceleratorRequest],
    machine_type: &str,
    defaults: &AcceleratorDefaults,
) -> AcceleratorResolution {
    let default = defaults.get(machine_type);

    let implicit;
    let requests = if requests.is_empty() && default.is_some() {
        implicit = [AcceleratorRequest::default()];
        &implicit[..]
    } else {
        requests
    };

    let accelerators: Vec<ResolvedAccelerator> = requests
        .iter()
        .map(|request| {
            let accelerator_type = if request.accelerator_type.is_empty() {
                default
                    .map(|d| d.accelerator_type.clone())
                    .unwrap_or_default()
            } else {
                request.accelerator_type.clone()
            };
            let count = if request.count == 0 {
                default.map(|d| d.count).unwrap_or(0)
            } else {
                request.count
            };

            ResolvedAccelerator {
                accelerator_type,
                count,
                partition_size: request.gpu_partition_size.clone(),
                driver_version: request
                    .gpu_driver_installation_config
                    .map(|c| c.gpu_driver_version)
                    .unwrap_or(GpuDriverVersion::Default),
                sharing_config: request.gpu_sharing_config,
            }
        })
        .collect();

    tracing::debug!(
        machine_type,
        count = accelerators.len(),
        "resolved accelerators"
    );

    AcceleratorResolution {
        has_gpu: !accelerators.is_empty(),
        accelerators,
    }
}

#[cfg(test)]
mod tests {
    use api_types::GpuDriverInstallationConfig;
    use api_types::GpuSharingConfig;
    use api_types::GpuSharingStrategy;
    use similar_asserts::assert_eq;

    use super::*;

    fn defaults() -> AcceleratorDefaults {
        AcceleratorDefaults::builtin()
    }

    #[test]
    fn empty_request_on_gpu_machine_uses_default() {
        let resolution = resolve_accelerators(&[], "a3-highgpu-8g", &defaults());

        assert!(resolution.has_gpu);
        assert_eq!(
            resolution.accelerators,
            vec![ResolvedAccelerator {
                accelerator_type: "nvidia-h100-80gb".to_string(),
                count: 8,
                partition_size: None,
                driver_version: GpuDriverVersion::Default,
                sharing_config: None,
            }]
        );
    }

    #[test]
    fn empty_request_on_cpu_machine_has_no_gpu() {
        let resolution = resolve_accelerators(&[], "n2-standard-8", &defaults());

        assert!(!resolution.has_gpu);
        assert!(resolution.accelerators.is_empty());
    }

    #[test]
    fn zero_count_is_replaced_by_default() {
        let request = AcceleratorRequest {
            accelerator_type: "nvidia-l4".to_string(),
            count: 0,
            ..Default::default()
        };

        let resolution = resolve_accelerators(&[request], "g2-standard-96", &defaults());

        assert_eq!(resolution.accelerators[0].accelerator_type, "nvidia-l4");
        assert_eq!(resolution.accelerators[0].count, 8);
    }

    #[test]
    fn empty_type_is_replaced_by_default() {
        let request = AcceleratorRequest {
            count: 2,
            ..Default::default()
        };

        let resolution = resolve_accelerators(&[request], "a2-highgpu-8g", &defaults());

        assert_eq!(
            resolution.accelerators[0].accelerator_type,
            "nvidia-tesla-a100"
        );
        assert_eq!(resolution.accelerators[0].count, 2);
    }

    #[test]
    fn missing_default_leaves_fields_unset() {
        let request = AcceleratorRequest::default();

        let resolution = resolve_accelerators(&[request], "n1-standard-4", &defaults());

        assert!(resolution.has_gpu);
        assert_eq!(resolution.accelerators[0].accelerator_type, "");
        assert_eq!(resolution.accelerators[0].count, 0);
    }

    #[test]
    fn explicit_fields_are_preserved() {
        let sharing = GpuSharingConfig {
            gpu_sharing_strategy: GpuSharingStrategy::Mps,
            max_shared_clients_per_gpu: 2,
        };
        let request = AcceleratorRequest {
            accelerator_type: "nvidia-tesla-t4".to_string(),
            count: 1,
            gpu_partition_size: Some("1g.5gb".to_string()),
            gpu_driver_installation_config: Some(GpuDriverInstallationConfig {
                gpu_driver_version: GpuDriverVersion::Latest,
            }),
            gpu_sharing_config: Some(sharing),
        };

        let resolution = resolve_accelerators(&[request], "a3-highgpu-8g", &defaults());

        assert_eq!(
            resolution.accelerators,
            vec![ResolvedAccelerator {
                accelerator_type: "nvidia-tesla-t4".to_string(),
                count: 1,
                partition_size: Some("1g.5gb".to_string()),
                driver_version: GpuDriverVersion::Latest,
                sharing_config: Some(sharing),
            }]
        );
    }
}
