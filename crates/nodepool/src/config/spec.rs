use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use api_types::NodePoolSpec;

/// Reads a node pool spec from a YAML file.
pub async fn load_spec(path: &Path) -> Result<NodePoolSpec> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read node pool spec {}", path.display()))?;
    let spec = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse node pool spec {}", path.display()))?;
    tracing::debug!("loaded node pool spec from {}", path.display());
    Ok(spec)
}
