//! In-memory collaborators for tests
//!
//! [`MockProvisioner`] and [`RecordingApplier`] record every call they get
//! and can be switched into a failing mode to exercise error paths.

use std::sync::Arc;
use std::sync::Mutex;

use api_types::NodePoolDescriptor;
use error_stack::Report;

use super::errors::ApplyError;
use super::errors::ProvisionError;
use super::traits::ApplyTarget;
use super::traits::ManifestApplier;
use super::traits::ManifestSource;
use super::traits::NodePoolProvisioner;
use super::traits::ProvisionedNodePool;

/// Provisioner that accepts every descriptor and remembers it
#[derive(Debug, Clone, Default)]
pub struct MockProvisioner {
    provisioned: Arc<Mutex<Vec<NodePoolDescriptor>>>,
    rejection: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with the given HTTP status and body
    pub fn reject_with(&self, status: u16, body: impl Into<String>) {
        *self.rejection.lock().expect("rejection lock poisoned") = Some((status, body.into()));
    }

    pub fn provisioned(&self) -> Vec<NodePoolDescriptor> {
        self.provisioned
            .lock()
            .expect("provisioned lock poisoned")
            .clone()
    }
}

#[async_trait::async_trait]
impl NodePoolProvisioner for MockProvisioner {
    async fn provision(
        &self,
        descriptor: &NodePoolDescriptor,
    ) -> Result<ProvisionedNodePool, Report<ProvisionError>> {
        if let Some((status, body)) = self.rejection.lock().expect("rejection lock poisoned").clone() {
            return Err(Report::new(ProvisionError::Rejected { status, body }));
        }

        let mut provisioned = self.provisioned.lock().expect("provisioned lock poisoned");
        provisioned.push(descriptor.clone());
        Ok(ProvisionedNodePool {
            id: format!("operation-{}-{}", provisioned.len(), descriptor.name),
        })
    }
}

/// Applier that records the sources of every call
#[derive(Debug, Clone, Default)]
pub struct RecordingApplier {
    calls: Arc<Mutex<Vec<(ApplyTarget, Vec<ManifestSource>)>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable failure mode
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("failing lock poisoned") = failing;
    }

    pub fn calls(&self) -> Vec<(ApplyTarget, Vec<ManifestSource>)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Every source applied so far, in order
    pub fn applied_sources(&self) -> Vec<ManifestSource> {
        self.calls()
            .into_iter()
            .flat_map(|(_, sources)| sources)
            .collect()
    }
}

#[async_trait::async_trait]
impl ManifestApplier for RecordingApplier {
    async fn apply(
        &self,
        target: &ApplyTarget,
        sources: &[ManifestSource],
    ) -> Result<(), Report<ApplyError>> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((target.clone(), sources.to_vec()));

        if *self.failing.lock().expect("failing lock poisoned") {
            return Err(Report::new(ApplyError::Connection {
                message: "recording applier is in failure mode".to_string(),
            }));
        }
        Ok(())
    }
}
