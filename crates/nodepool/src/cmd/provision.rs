use anyhow::Result;
use nodepool::app::NodePoolDeployer;
use nodepool::config::load_spec;
use nodepool::config::LookupTables;
use nodepool::config::ProvisionArgs;
use nodepool::infrastructure::GkeProvisioner;
use nodepool::infrastructure::KubeManifestApplier;

pub async fn run_provision(args: ProvisionArgs, tables: LookupTables) -> Result<()> {
    let spec = load_spec(&args.spec).await?;

    let provisioner = GkeProvisioner::new(args.endpoint, args.access_token);
    let applier = KubeManifestApplier::new(args.kubeconfig, args.kube_context);
    let deployer = NodePoolDeployer::new(tables, provisioner, applier);

    let outcome = deployer
        .deploy(&spec)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to deploy node pool {}: {e:?}", spec.name))?;

    tracing::info!(
        "node pool {} provisioned (operation {})",
        outcome.descriptor.name,
        outcome.node_pool.id
    );
    if let Some(patched) = &outcome.patched_workload {
        tracing::info!("patched workload written to {}", patched.display());
    }
    Ok(())
}
