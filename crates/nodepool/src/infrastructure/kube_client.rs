use std::ffi::OsString;
use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::domain::ApplyError;

/// Builds a client for `context`.
///
/// The kubeconfig is read from `kubeconfig` when given, otherwise from the
/// default location (`KUBECONFIG` or `~/.kube/config`). The in-cluster
/// configuration is used only when no default kubeconfig file exists; an
/// existing but unreadable one is an error.
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
) -> Result<Client, Report<ApplyError>> {
    let options = KubeConfigOptions {
        context,
        ..Default::default()
    };

    let kubeconfig = match kubeconfig {
        Some(kubeconfig_path) => Some(Kubeconfig::read_from(&kubeconfig_path).change_context(
            ApplyError::Connection {
                message: format!(
                    "Failed to read kubeconfig file: {}",
                    kubeconfig_path.display()
                ),
            },
        )?),
        None => match Kubeconfig::read() {
            Ok(kubeconfig) => Some(kubeconfig),
            Err(e) => {
                let existing = existing_kubeconfigs(
                    std::env::var_os("KUBECONFIG"),
                    std::env::var_os("HOME").map(PathBuf::from),
                );
                if existing.is_empty() {
                    None
                } else {
                    return Err(Report::new(e).change_context(ApplyError::Connection {
                        message: format!("Failed to read kubeconfig file: {}", existing[0].display()),
                    }));
                }
            }
        },
    };

    let client = match kubeconfig {
        Some(kubeconfig) => {
            let config = Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .change_context_lazy(|| ApplyError::Connection {
                    message: format!(
                        "Failed to create config for context {}",
                        options.context.as_deref().unwrap_or("<current>")
                    ),
                })?;

            Client::try_from(config).change_context(ApplyError::Connection {
                message: "Failed to create Kubernetes client from kubeconfig".to_string(),
            })?
        }
        None => {
            tracing::debug!("no kubeconfig found, using in-cluster configuration");
            Client::try_default()
                .await
                .change_context(ApplyError::Connection {
                    message: "Failed to create Kubernetes client".to_string(),
                })?
        }
    };
    Ok(client)
}

/// Default kubeconfig files that exist on disk: every entry of `KUBECONFIG`
/// when set, otherwise `~/.kube/config`.
fn existing_kubeconfigs(kubeconfig_env: Option<OsString>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let candidates: Vec<PathBuf> = match kubeconfig_env {
        Some(paths) if !paths.is_empty() => std::env::split_paths(&paths).collect(),
        _ => home
            .map(|home| home.join(".kube").join("config"))
            .into_iter()
            .collect(),
    };
    candidates.into_iter().filter(|path| path.is_file()).collect()
}
