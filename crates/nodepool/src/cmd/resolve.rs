use anyhow::Result;
use nodepool::config::load_spec;
use nodepool::config::LookupTables;
use nodepool::config::OutputFormat;
use nodepool::config::ResolveArgs;
use nodepool::domain::NodePoolDescriptorBuilder;

pub async fn run_resolve(args: ResolveArgs, tables: LookupTables) -> Result<()> {
    let spec = load_spec(&args.spec).await?;

    let descriptor = NodePoolDescriptorBuilder::new(&tables)
        .build(&spec)
        .map_err(|errors| {
            anyhow::Error::new(errors)
                .context(format!("invalid node pool spec {}", args.spec.display()))
        })?;

    let rendered = match args.format {
        OutputFormat::Yaml => serde_yaml::to_string(&descriptor)?,
        OutputFormat::Json => serde_json::to_string_pretty(&descriptor)?,
    };
    println!("{rendered}");
    Ok(())
}
