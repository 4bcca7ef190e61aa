use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::spec::AdditionalNetwork;
use crate::spec::GpuDriverVersion;
use crate::spec::GpuSharingConfig;
use crate::spec::MaintenanceInterval;
use crate::spec::PlacementPolicy;
use crate::spec::ReservationType;
use crate::spec::Taint;
use crate::spec::Timeouts;
use crate::spec::UpgradeSettings;

/// Fully resolved node pool, ready for submission to a provisioner.
///
/// Only produced by a successful validation pass; every cross-field rule
/// holds for any value of this type built by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePoolDescriptor {
    pub name: String,
    pub cluster: ClusterRef,
    pub machine_type: String,
    pub zones: Vec<String>,
    pub disk_size_gb: u32,
    pub disk_type: String,
    pub service_account_email: Option<String>,
    pub oauth_scopes: Vec<String>,
    pub image_type: String,
    pub scaling: ScalingMode,
    pub accelerators: Vec<ResolvedAccelerator>,
    /// User taints followed by derived taints
    pub taints: Vec<Taint>,
    pub local_ssd: Option<LocalSsdConfig>,
    pub reservation_affinity: ResolvedReservationAffinity,
    pub placement_policy: PlacementPolicy,
    pub host_maintenance_interval: Option<MaintenanceInterval>,
    pub additional_networks: Vec<AdditionalNetwork>,
    pub upgrade_settings: UpgradeSettings,
    pub auto_upgrade: bool,
    pub spot: bool,
    pub enable_gcfs: bool,
    pub enable_gvnic: bool,
    pub threads_per_core: Option<u32>,
    pub kubernetes_labels: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub timeouts: Timeouts,
    pub gpu_direct: GpuDirectSetting,
}

impl NodePoolDescriptor {
    pub fn has_gpu(&self) -> bool {
        !self.accelerators.is_empty()
    }
}

/// Cluster coordinates parsed from a cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub project: String,
    pub location: String,
    pub cluster: String,
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/clusters/{}",
            self.project, self.location, self.cluster
        )
    }
}

/// How the pool is sized; exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScalingMode {
    Static { node_count: u32 },
    Autoscaling { min: u32, max: u32 },
    AutoscalingWithSeed { min: u32, max: u32, initial: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAccelerator {
    #[serde(rename = "type")]
    pub accelerator_type: String,
    pub count: u32,
    pub partition_size: Option<String>,
    pub driver_version: GpuDriverVersion,
    pub sharing_config: Option<GpuSharingConfig>,
}

/// Active local SSD consumption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocalSsdConfig {
    EphemeralStorage { local_ssd_count: u32 },
    NvmeBlock { local_ssd_count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReservationAffinity {
    pub consume_reservation_type: ReservationType,
    /// Set only when a specific reservation is targeted
    pub key: Option<String>,
    pub values: Vec<String>,
}

/// GPUDirect transport flavor; selects the sidecar profile used for patching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuDirectFlavor {
    Tcpx,
    Tcpxo,
}

impl fmt::Display for GpuDirectFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcpx => f.write_str("tcpx"),
            Self::Tcpxo => f.write_str("tcpxo"),
        }
    }
}

/// Post-provisioning GPUDirect work for a machine type.
///
/// The default value is the no-op setting used for machine types without
/// GPUDirect support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDirectSetting {
    pub flavor: Option<GpuDirectFlavor>,
    /// Manifests applied to the cluster once the pool exists
    pub manifest_paths: Vec<String>,
    /// Where the patched user workload is written
    pub workload_path: Option<PathBuf>,
    pub rxdm_version: String,
}

impl GpuDirectSetting {
    pub fn is_enabled(&self) -> bool {
        self.flavor.is_some()
    }
}
