use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Upper autoscaling bound used when the caller does not set one.
pub const DEFAULT_AUTOSCALING_MAX_NODES: u32 = 1000;

/// Lower autoscaling bound used when the caller does not set one.
pub const DEFAULT_AUTOSCALING_MIN_NODES: u32 = 0;

/// User supplied node pool configuration.
///
/// Every field has a default so a minimal YAML document only needs `name`,
/// `cluster_id` and whatever the caller wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePoolSpec {
    /// Node pool name
    pub name: String,
    /// Owning cluster, `projects/{project}/locations/{location}/clusters/{cluster}`
    pub cluster_id: String,
    /// Compute machine type (e.g. "a3-highgpu-8g")
    pub machine_type: String,
    /// Zones the pool spans; empty means the cluster's default locations
    pub zones: Vec<String>,
    /// Boot disk size in GB
    pub disk_size_gb: u32,
    /// Boot disk type (e.g. "pd-standard", "pd-ssd")
    pub disk_type: String,
    /// Service account email attached to the nodes
    pub service_account_email: Option<String>,
    /// OAuth scopes granted to the service account
    pub service_account_scopes: Vec<String>,
    /// Node OS image type
    pub image_type: String,
    /// Accelerators attached to each node
    pub guest_accelerator: Vec<AcceleratorRequest>,
    /// Taints applied to each node
    pub taints: Vec<Taint>,
    /// Local SSDs used as ephemeral storage
    pub local_ssd_count_ephemeral_storage: Option<u32>,
    /// Local SSDs exposed as raw NVMe block devices
    pub local_ssd_count_nvme_block: Option<u32>,
    /// Fixed node count; mutually exclusive with autoscaling
    pub static_node_count: Option<u32>,
    /// Total minimum node count across all zones
    pub autoscaling_total_min_nodes: u32,
    /// Total maximum node count across all zones
    pub autoscaling_total_max_nodes: u32,
    /// Node count created up front in an autoscaled pool
    pub initial_node_count: Option<u32>,
    pub reservation_affinity: ReservationAffinity,
    pub placement_policy: PlacementPolicy,
    pub host_maintenance_interval: Option<MaintenanceInterval>,
    /// Extra node network attachments (multi-NIC machine shapes)
    pub additional_networks: Vec<AdditionalNetwork>,
    pub upgrade_settings: UpgradeSettings,
    pub auto_upgrade: bool,
    pub spot: bool,
    /// Image streaming
    pub enable_gcfs: bool,
    pub enable_gvnic: bool,
    pub threads_per_core: Option<u32>,
    /// Kubernetes labels applied to every node
    pub kubernetes_labels: BTreeMap<String, String>,
    /// Cloud resource labels applied to the node VMs
    pub labels: BTreeMap<String, String>,
    pub timeouts: Timeouts,
    /// Workload patching for GPUDirect machine shapes
    pub gpu_direct_config: Option<GpuDirectConfig>,
}

impl Default for NodePoolSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            cluster_id: String::new(),
            machine_type: "c2-standard-60".to_string(),
            zones: Vec::new(),
            disk_size_gb: 100,
            disk_type: "pd-standard".to_string(),
            service_account_email: None,
            service_account_scopes: vec![
                "https://www.googleapis.com/auth/cloud-platform".to_string()
            ],
            image_type: "COS_CONTAINERD".to_string(),
            guest_accelerator: Vec::new(),
            taints: Vec::new(),
            local_ssd_count_ephemeral_storage: None,
            local_ssd_count_nvme_block: None,
            static_node_count: None,
            autoscaling_total_min_nodes: DEFAULT_AUTOSCALING_MIN_NODES,
            autoscaling_total_max_nodes: DEFAULT_AUTOSCALING_MAX_NODES,
            initial_node_count: None,
            reservation_affinity: ReservationAffinity::default(),
            placement_policy: PlacementPolicy::default(),
            host_maintenance_interval: None,
            additional_networks: Vec::new(),
            upgrade_settings: UpgradeSettings::default(),
            auto_upgrade: false,
            spot: false,
            enable_gcfs: false,
            enable_gvnic: false,
            threads_per_core: None,
            kubernetes_labels: BTreeMap::new(),
            labels: BTreeMap::new(),
            timeouts: Timeouts::default(),
            gpu_direct_config: None,
        }
    }
}

/// A requested accelerator; empty `type` or zero `count` fall back to the
/// machine type's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorRequest {
    #[serde(rename = "type")]
    pub accelerator_type: String,
    pub count: u32,
    /// MIG partition size (e.g. "1g.5gb")
    pub gpu_partition_size: Option<String>,
    pub gpu_driver_installation_config: Option<GpuDriverInstallationConfig>,
    pub gpu_sharing_config: Option<GpuSharingConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDriverInstallationConfig {
    pub gpu_driver_version: GpuDriverVersion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GpuDriverVersion {
    GpuDriverVersionUnspecified,
    InstallationDisabled,
    #[default]
    Default,
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuSharingConfig {
    pub gpu_sharing_strategy: GpuSharingStrategy,
    pub max_shared_clients_per_gpu: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GpuSharingStrategy {
    TimeSharing,
    Mps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

impl std::fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let effect = match self {
            Self::NoSchedule => "NO_SCHEDULE",
            Self::PreferNoSchedule => "PREFER_NO_SCHEDULE",
            Self::NoExecute => "NO_EXECUTE",
        };
        f.write_str(effect)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationAffinity {
    pub consume_reservation_type: ReservationType,
    pub specific_reservations: Vec<ReservationRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationType {
    #[default]
    NoReservation,
    AnyReservation,
    SpecificReservation,
}

impl std::fmt::Display for ReservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self {
            Self::NoReservation => "NO_RESERVATION",
            Self::AnyReservation => "ANY_RESERVATION",
            Self::SpecificReservation => "SPECIFIC_RESERVATION",
        };
        f.write_str(mode)
    }
}

/// Reference to a capacity reservation in some project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRef {
    pub project: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPolicy {
    #[serde(rename = "type")]
    pub placement_type: Option<PlacementType>,
    /// Existing resource policy to use for compact placement
    pub policy_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementType {
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceInterval {
    Periodic,
    AsNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalNetwork {
    pub network: String,
    pub subnetwork: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSettings {
    pub strategy: UpgradeStrategy,
    pub max_surge: u32,
    pub max_unavailable: u32,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            strategy: UpgradeStrategy::Surge,
            max_surge: 0,
            max_unavailable: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeStrategy {
    #[default]
    Surge,
    BlueGreen,
}

/// Provider-side operation timeouts, passed through verbatim (e.g. "60m").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create: String,
    pub update: String,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: "60m".to_string(),
            update: "60m".to_string(),
        }
    }
}

/// User overrides for the GPUDirect post-provisioning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuDirectConfig {
    /// Workload manifest to patch with the RxDM sidecar
    pub user_workload_path: Option<PathBuf>,
    /// Replaces the machine type's default manifest list when set
    pub gpu_direct_manifests: Option<Vec<String>>,
    /// Replaces the machine type's default RxDM image tag when set
    pub rxdm_version: Option<String>,
}
