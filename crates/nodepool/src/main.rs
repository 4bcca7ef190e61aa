mod cmd;

use anyhow::Result;
use clap::Parser;
use nodepool::config::load_tables;
use nodepool::config::Cli;
use nodepool::config::Commands;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    let _guard = match &cli.log_file {
        Some(log_file) => Some(logging::init_with_file(log_file)?),
        None => {
            logging::init();
            None
        }
    };

    tracing::debug!("nodepool {}", &**version::VERSION);

    let tables = load_tables(
        cli.accelerator_defaults.as_deref(),
        cli.gpu_direct_settings.as_deref(),
    )
    .await?;

    match cli.command {
        Commands::Resolve(args) => cmd::run_resolve(args, tables).await,
        Commands::Provision(args) => cmd::run_provision(args, tables).await,
        Commands::PatchWorkload(args) => cmd::run_patch_workload(args, tables).await,
    }
}
