use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use utils::version;

use crate::infrastructure::DEFAULT_GKE_ENDPOINT;

#[derive(Parser)]
#[command(about = "Resolve, validate and provision GKE node pools", long_about, version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "NODEPOOL_ACCELERATOR_DEFAULTS",
        value_hint = clap::ValueHint::FilePath,
        help = "YAML file mapping machine types to default accelerators, layered over the built-in table"
    )]
    pub accelerator_defaults: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "NODEPOOL_GPU_DIRECT_SETTINGS",
        value_hint = clap::ValueHint::FilePath,
        help = "YAML file mapping machine types to GPUDirect settings, layered over the built-in table"
    )]
    pub gpu_direct_settings: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "NODEPOOL_LOG_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Also write logs to this file, rotated daily"
    )]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a node pool spec and print the descriptor
    Resolve(ResolveArgs),
    /// Resolve, provision and run the GPUDirect post-provisioning steps
    Provision(ProvisionArgs),
    /// Patch a workload manifest with the GPUDirect RxDM sidecar
    #[command(name = "patch-workload")]
    PatchWorkload(PatchWorkloadArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Node pool spec, e.g. pool.yaml"
    )]
    pub spec: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct ProvisionArgs {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Node pool spec, e.g. pool.yaml"
    )]
    pub spec: PathBuf,

    #[arg(
        long,
        env = "GKE_ENDPOINT",
        default_value = DEFAULT_GKE_ENDPOINT,
        help = "GKE API endpoint"
    )]
    pub endpoint: String,

    #[arg(
        long,
        env = "GOOGLE_OAUTH_ACCESS_TOKEN",
        hide_env_values = true,
        help = "OAuth2 access token used for the GKE API, e.g. from `gcloud auth print-access-token`"
    )]
    pub access_token: String,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to ~/.kube/config or cluster config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        help = "Kubeconfig context for applying manifests (defaults to gke_<project>_<location>_<cluster>)"
    )]
    pub kube_context: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct PatchWorkloadArgs {
    #[arg(long, help = "Machine type selecting the GPUDirect flavor, e.g. a3-highgpu-8g")]
    pub machine_type: String,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Workload manifest to patch; the result is written next to it"
    )]
    pub workload: PathBuf,

    #[arg(long, help = "RxDM image tag, defaults to the machine type's setting")]
    pub rxdm_version: Option<String>,
}
