//! Server-side apply of arbitrary manifests

use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use futures::future::try_join_all;
use kube::api::DynamicObject;
use kube::api::GroupVersionKind;
use kube::api::Patch;
use kube::api::PatchParams;
use kube::discovery::Discovery;
use kube::discovery::Scope;
use kube::Api;
use kube::Client;
use kube::ResourceExt;
use serde::Deserialize;
use tracing::info;

use super::kube_client::init_kube_client;
use crate::domain::ApplyError;
use crate::domain::ApplyTarget;
use crate::domain::ManifestApplier;
use crate::domain::ManifestSource;

pub const FIELD_MANAGER: &str = "nodepool";

const DEFAULT_NAMESPACE: &str = "default";

/// Applies manifests with server-side apply, resolving each object's kind
/// through API discovery.
pub struct KubeManifestApplier {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    http: reqwest::Client,
}

impl KubeManifestApplier {
    /// `context` overrides the GKE context derived from the apply target.
    pub fn new(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        Self {
            kubeconfig,
            context,
            http: reqwest::Client::new(),
        }
    }

    async fn load(&self, source: &ManifestSource) -> Result<String, Report<ApplyError>> {
        let error = || ApplyError::Source {
            source: source.to_string(),
        };
        match source {
            ManifestSource::Path(path) => tokio::fs::read_to_string(path)
                .await
                .change_context_lazy(error),
            ManifestSource::Url(url) => {
                let response = self
                    .http
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .change_context_lazy(error)?;
                response.text().await.change_context_lazy(error)
            }
        }
    }
}

#[async_trait::async_trait]
impl ManifestApplier for KubeManifestApplier {
    #[tracing::instrument(skip_all, fields(cluster = %target.cluster))]
    async fn apply(
        &self,
        target: &ApplyTarget,
        sources: &[ManifestSource],
    ) -> Result<(), Report<ApplyError>> {
        let context = self
            .context
            .clone()
            .unwrap_or_else(|| target.kube_context());
        let client = init_kube_client(self.kubeconfig.clone(), Some(context)).await?;

        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .change_context(ApplyError::Discovery {
                message: "Failed to list API resources".to_string(),
            })?;

        let contents = try_join_all(sources.iter().map(|source| self.load(source))).await?;

        for (source, content) in sources.iter().zip(contents) {
            let objects = parse_objects(&content, source)?;
            info!("applying {} object(s) from {}", objects.len(), source);
            for object in objects {
                apply_object(&client, &discovery, object, source).await?;
            }
        }
        Ok(())
    }
}

/// Splits a multi-document manifest into objects, skipping empty documents.
pub fn parse_objects(
    content: &str,
    source: &ManifestSource,
) -> Result<Vec<DynamicObject>, Report<ApplyError>> {
    let error = || ApplyError::Parse {
        source: source.to_string(),
    };
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document).change_context_lazy(error)?;
        if value.is_null() {
            continue;
        }
        let object: DynamicObject = serde_yaml::from_value(value).change_context_lazy(error)?;
        objects.push(object);
    }
    Ok(objects)
}

/// Group, version and kind of an object's `apiVersion` and `kind`.
pub fn group_version_kind(object: &DynamicObject) -> Option<GroupVersionKind> {
    let types = object.types.as_ref()?;
    let (group, version) = types
        .api_version
        .split_once('/')
        .unwrap_or(("", types.api_version.as_str()));
    Some(GroupVersionKind::gvk(group, version, &types.kind))
}

async fn apply_object(
    client: &Client,
    discovery: &Discovery,
    object: DynamicObject,
    source: &ManifestSource,
) -> Result<(), Report<ApplyError>> {
    let kind = object
        .types
        .as_ref()
        .map(|types| types.kind.clone())
        .unwrap_or_default();
    let unknown = || ApplyError::UnknownKind {
        kind: kind.clone(),
        source: source.to_string(),
    };

    let gvk = group_version_kind(&object).ok_or_else(|| Report::new(unknown()))?;
    let (resource, capabilities) = discovery
        .resolve_gvk(&gvk)
        .ok_or_else(|| Report::new(unknown()))?;

    let name = object.name_any();
    let api: Api<DynamicObject> = match capabilities.scope {
        Scope::Namespaced => {
            let namespace = object
                .namespace()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
            Api::namespaced_with(client.clone(), &namespace, &resource)
        }
        Scope::Cluster => Api::all_with(client.clone(), &resource),
    };

    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&object),
    )
    .await
    .change_context_lazy(|| ApplyError::Apply {
        kind: kind.clone(),
        name: name.clone(),
    })?;
    info!("applied {} {}", kind, name);
    Ok(())
}
