pub mod gke;
pub mod kube_applier;
pub mod kube_client;

pub use gke::GkeProvisioner;
pub use gke::DEFAULT_GKE_ENDPOINT;
pub use kube_applier::KubeManifestApplier;
