//! Collaborator traits the deployment flow depends on

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use api_types::ClusterRef;
use api_types::NodePoolDescriptor;
use error_stack::Report;
use url::Url;

use super::errors::ApplyError;
use super::errors::ProvisionError;

/// Identifier returned by a provisioner for an accepted node pool request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedNodePool {
    pub id: String,
}

/// Submits a fully resolved node pool to the cloud provider.
///
/// Implementations make at most one call per descriptor and do not retry.
#[async_trait::async_trait]
pub trait NodePoolProvisioner: Send + Sync {
    async fn provision(
        &self,
        descriptor: &NodePoolDescriptor,
    ) -> Result<ProvisionedNodePool, Report<ProvisionError>>;
}

/// Cluster the manifests are applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyTarget {
    pub cluster: ClusterRef,
}

impl ApplyTarget {
    /// Context name `gcloud container clusters get-credentials` writes.
    pub fn kube_context(&self) -> String {
        format!(
            "gke_{}_{}_{}",
            self.cluster.project, self.cluster.location, self.cluster.cluster
        )
    }
}

impl From<&ClusterRef> for ApplyTarget {
    fn from(cluster: &ClusterRef) -> Self {
        Self {
            cluster: cluster.clone(),
        }
    }
}

/// Location of a manifest: a local file or an `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Path(PathBuf),
    Url(Url),
}

impl ManifestSource {
    /// Strings with an `http` or `https` scheme are URLs, everything else is
    /// a path.
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            _ => Self::Path(PathBuf::from(source)),
        }
    }
}

impl From<&Path> for ManifestSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Applies Kubernetes manifests to a cluster.
#[async_trait::async_trait]
pub trait ManifestApplier: Send + Sync {
    async fn apply(
        &self,
        target: &ApplyTarget,
        sources: &[ManifestSource],
    ) -> Result<(), Report<ApplyError>>;
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn manifest_source_detects_urls() {
        let url = "https://raw.githubusercontent.com/org/repo/master/installer.yaml";

        assert_eq!(
            ManifestSource::parse(url),
            ManifestSource::Url(Url::parse(url).unwrap())
        );
        assert_eq!(
            ManifestSource::parse("manifests/job.yaml"),
            ManifestSource::Path(PathBuf::from("manifests/job.yaml"))
        );
        assert_eq!(
            ManifestSource::parse("/abs/job.yaml"),
            ManifestSource::Path(PathBuf::from("/abs/job.yaml"))
        );
    }

    #[test]
    fn kube_context_follows_gke_naming() {
        let target = ApplyTarget {
            cluster: ClusterRef {
                project: "p".to_string(),
                location: "us-central1".to_string(),
                cluster: "c".to_string(),
            },
        };

        assert_eq!(target.kube_context(), "gke_p_us-central1_c");
    }
}
