use std::sync::LazyLock;

/// Git commit the binary was built from, when the build script could read it.
const COMMIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

/// Set to "true" by the build script for builds from a modified work tree.
const GIT_DIRTY: Option<&str> = option_env!("VERGEN_GIT_DIRTY");

/// Defines the application version.
pub static VERSION: LazyLock<String> =
    LazyLock::new(|| format_version(env!("NODEPOOL_VERSION"), COMMIT_SHA, GIT_DIRTY));

fn format_version(release: &str, sha: Option<&str>, dirty: Option<&str>) -> String {
    let sha = sha.map(|sha| &sha[..sha.len().min(8)]).unwrap_or("unknown");
    let dirty = if dirty == Some("true") { "-dirty" } else { "" };
    format!("{release}-{sha}{dirty}")
}
