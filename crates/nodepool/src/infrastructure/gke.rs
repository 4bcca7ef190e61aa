//! GKE REST provisioner
//!
//! Maps a [`NodePoolDescriptor`] onto the `projects.locations.clusters.nodePools.create`
//! request of the GKE v1 API and submits it once.

use api_types::ClusterRef;
use api_types::LocalSsdConfig;
use api_types::NodePoolDescriptor;
use api_types::ScalingMode;
use error_stack::Report;
use error_stack::ResultExt;
use serde::Deserialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::domain::NodePoolProvisioner;
use crate::domain::ProvisionError;
use crate::domain::ProvisionedNodePool;

pub const DEFAULT_GKE_ENDPOINT: &str = "https://container.googleapis.com";

/// Long-running operation returned by the create call
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
}

pub struct GkeProvisioner {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl GkeProvisioner {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        }
    }

    fn node_pools_url(&self, cluster: &ClusterRef) -> String {
        format!("{}/v1/{}/nodePools", self.endpoint.trim_end_matches('/'), cluster)
    }
}

#[async_trait::async_trait]
impl NodePoolProvisioner for GkeProvisioner {
    #[tracing::instrument(skip_all, fields(node_pool = %descriptor.name, cluster = %descriptor.cluster))]
    async fn provision(
        &self,
        descriptor: &NodePoolDescriptor,
    ) -> Result<ProvisionedNodePool, Report<ProvisionError>> {
        let url = self.node_pools_url(&descriptor.cluster);
        let body = node_pool_request(descriptor);
        debug!("POST {} {}", url, body);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .change_context_lazy(|| ProvisionError::Request {
                message: format!("POST {url}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Report::new(ProvisionError::Rejected {
                status: status.as_u16(),
                body: rejection_body(response.text().await),
            }));
        }

        let operation: Operation =
            response
                .json()
                .await
                .change_context(ProvisionError::InvalidResponse {
                    message: "expected an operation with a name".to_string(),
                })?;
        info!("node pool create operation started: {}", operation.name);

        Ok(ProvisionedNodePool { id: operation.name })
    }
}

/// Body of a rejected call, or the reason it could not be read.
fn rejection_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<failed to read response body: {e}>"))
}

/// Request body of the node pool create call.
pub fn node_pool_request(descriptor: &NodePoolDescriptor) -> Value {
    let mut node_pool = Map::new();
    node_pool.insert("name".into(), json!(descriptor.name));
    node_pool.insert("config".into(), node_config(descriptor));

    if !descriptor.zones.is_empty() {
        node_pool.insert("locations".into(), json!(descriptor.zones));
    }

    match descriptor.scaling {
        ScalingMode::Static { node_count } => {
            node_pool.insert("initialNodeCount".into(), json!(node_count));
        }
        ScalingMode::Autoscaling { min, max } => {
            node_pool.insert("autoscaling".into(), autoscaling(min, max));
        }
        ScalingMode::AutoscalingWithSeed { min, max, initial } => {
            node_pool.insert("initialNodeCount".into(), json!(initial));
            node_pool.insert("autoscaling".into(), autoscaling(min, max));
        }
    }

    node_pool.insert(
        "management".into(),
        json!({"autoUpgrade": descriptor.auto_upgrade, "autoRepair": true}),
    );

    let upgrade = descriptor.upgrade_settings;
    node_pool.insert(
        "upgradeSettings".into(),
        json!({
            "strategy": upgrade.strategy,
            "maxSurge": upgrade.max_surge,
            "maxUnavailable": upgrade.max_unavailable,
        }),
    );

    if let Some(placement_type) = descriptor.placement_policy.placement_type {
        let mut placement = json!({"type": placement_type});
        if let Some(policy_name) = &descriptor.placement_policy.policy_name {
            placement["policyName"] = json!(policy_name);
        }
        node_pool.insert("placementPolicy".into(), placement);
    }

    if !descriptor.additional_networks.is_empty() {
        let networks: Vec<Value> = descriptor
            .additional_networks
            .iter()
            .map(|n| json!({"network": n.network, "subnetwork": n.subnetwork}))
            .collect();
        node_pool.insert(
            "networkConfig".into(),
            json!({"additionalNodeNetworkConfigs": networks}),
        );
    }

    json!({ "nodePool": node_pool })
}

fn autoscaling(min: u32, max: u32) -> Value {
    json!({
        "enabled": true,
        "totalMinNodeCount": min,
        "totalMaxNodeCount": max,
    })
}

fn node_config(descriptor: &NodePoolDescriptor) -> Value {
    let mut config = Map::new();
    config.insert("machineType".into(), json!(descriptor.machine_type));
    config.insert("diskSizeGb".into(), json!(descriptor.disk_size_gb));
    config.insert("diskType".into(), json!(descriptor.disk_type));
    config.insert("imageType".into(), json!(descriptor.image_type));
    config.insert("oauthScopes".into(), json!(descriptor.oauth_scopes));
    config.insert("spot".into(), json!(descriptor.spot));
    config.insert("labels".into(), json!(descriptor.kubernetes_labels));
    config.insert("resourceLabels".into(), json!(descriptor.labels));
    config.insert("gcfsConfig".into(), json!({"enabled": descriptor.enable_gcfs}));
    config.insert("gvnic".into(), json!({"enabled": descriptor.enable_gvnic}));

    if let Some(email) = &descriptor.service_account_email {
        config.insert("serviceAccount".into(), json!(email));
    }

    let accelerators: Vec<Value> = descriptor
        .accelerators
        .iter()
        .map(|accelerator| {
            let mut value = json!({
                "acceleratorType": accelerator.accelerator_type,
                "acceleratorCount": accelerator.count.to_string(),
                "gpuDriverInstallationConfig": {
                    "gpuDriverVersion": accelerator.driver_version,
                },
            });
            if let Some(size) = &accelerator.partition_size {
                value["gpuPartitionSize"] = json!(size);
            }
            if let Some(sharing) = &accelerator.sharing_config {
                value["gpuSharingConfig"] = json!({
                    "gpuSharingStrategy": sharing.gpu_sharing_strategy,
                    "maxSharedClientsPerGpu": sharing.max_shared_clients_per_gpu.to_string(),
                });
            }
            value
        })
        .collect();
    if !accelerators.is_empty() {
        config.insert("accelerators".into(), Value::Array(accelerators));
    }

    let taints: Vec<Value> = descriptor
        .taints
        .iter()
        .map(|t| json!({"key": t.key, "value": t.value, "effect": t.effect}))
        .collect();
    if !taints.is_empty() {
        config.insert("taints".into(), Value::Array(taints));
    }

    match descriptor.local_ssd {
        Some(LocalSsdConfig::EphemeralStorage { local_ssd_count }) => {
            config.insert(
                "ephemeralStorageLocalSsdConfig".into(),
                json!({"localSsdCount": local_ssd_count}),
            );
        }
        Some(LocalSsdConfig::NvmeBlock { local_ssd_count }) => {
            config.insert(
                "localNvmeSsdBlockConfig".into(),
                json!({"localSsdCount": local_ssd_count}),
            );
        }
        None => {}
    }

    let reservation = &descriptor.reservation_affinity;
    let mut affinity = json!({"consumeReservationType": reservation.consume_reservation_type});
    if let Some(key) = &reservation.key {
        affinity["key"] = json!(key);
        affinity["values"] = json!(reservation.values);
    }
    config.insert("reservationAffinity".into(), affinity);

    if let Some(interval) = descriptor.host_maintenance_interval {
        config.insert(
            "hostMaintenancePolicy".into(),
            json!({"maintenanceInterval": interval}),
        );
    }
    if let Some(threads) = descriptor.threads_per_core {
        config.insert(
            "advancedMachineFeatures".into(),
            json!({"threadsPerCore": threads.to_string()}),
        );
    }

    Value::Object(config)
}
