use anyhow::Context;
use anyhow::Result;
use api_types::GpuDirectConfig;
use nodepool::config::LookupTables;
use nodepool::config::PatchWorkloadArgs;
use nodepool::domain::WorkloadPatcher;

pub async fn run_patch_workload(args: PatchWorkloadArgs, tables: LookupTables) -> Result<()> {
    let config = GpuDirectConfig {
        user_workload_path: Some(args.workload.clone()),
        gpu_direct_manifests: None,
        rxdm_version: args.rxdm_version,
    };
    let setting = tables.gpu_direct.resolve(&args.machine_type, Some(&config));

    let Some(patcher) = WorkloadPatcher::from_setting(&setting) else {
        anyhow::bail!(
            "machine type {} has no GPUDirect setting, nothing to patch",
            args.machine_type
        );
    };
    let destination = setting
        .workload_path
        .context("GPUDirect setting has no workload path")?;

    patcher
        .patch_file(&args.workload, &destination)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to patch workload: {e:?}"))?;

    println!("{}", destination.display());
    Ok(())
}
