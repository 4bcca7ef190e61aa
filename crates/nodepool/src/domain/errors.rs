use core::error::Error;
use std::fmt;
use std::path::PathBuf;

use api_types::ReservationType;
use thiserror::Error;

/// A single violated node pool rule.
///
/// Messages name the offending spec fields so they can be shown to the user
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error(
        "cluster_id `{value}` must have the form projects/{{project}}/locations/{{location}}/clusters/{{cluster}}"
    )]
    InvalidClusterId { value: String },
    #[error("zones[{index}] must not be empty")]
    EmptyZone { index: usize },
    #[error(
        "guest_accelerator[{index}]: count is 0 and machine type `{machine_type}` has no default accelerator count"
    )]
    AcceleratorCountUnresolved { index: usize, machine_type: String },
    #[error(
        "guest_accelerator[{index}]: type is empty and machine type `{machine_type}` has no default accelerator type"
    )]
    AcceleratorTypeUnresolved { index: usize, machine_type: String },
    #[error(
        "only one of local_ssd_count_ephemeral_storage ({ephemeral}) or local_ssd_count_nvme_block ({nvme_block}) may be set to a non-zero value"
    )]
    LocalSsdConflict { ephemeral: u32, nvme_block: u32 },
    #[error(
        "reservation_affinity: SPECIFIC_RESERVATION requires exactly one entry in specific_reservations, found {found}"
    )]
    SpecificReservationCount { found: usize },
    #[error(
        "reservation_affinity: specific_reservations must be empty when consume_reservation_type is {mode}, found {found}"
    )]
    UnexpectedSpecificReservations { mode: ReservationType, found: usize },
    #[error(
        "static_node_count cannot be set together with autoscaling_total_min_nodes ({min}) or autoscaling_total_max_nodes ({max})"
    )]
    StaticWithAutoscaling { min: u32, max: u32 },
    #[error("static_node_count cannot be set together with initial_node_count")]
    StaticWithInitial,
    #[error(
        "initial_node_count ({initial}) must be between autoscaling_total_min_nodes ({min}) and autoscaling_total_max_nodes ({max})"
    )]
    InitialOutOfBounds { initial: u32, min: u32, max: u32 },
    #[error(
        "autoscaling_total_min_nodes ({min}) must not exceed autoscaling_total_max_nodes ({max})"
    )]
    AutoscalingBoundsInverted { min: u32, max: u32 },
    #[error("upgrade_settings: max_surge and max_unavailable cannot both be 0 for SURGE upgrades")]
    SurgeWithoutCapacity,
    #[error("placement_policy: policy_name is only allowed when type is COMPACT")]
    PlacementPolicyNameWithoutCompact,
}

/// The complete, non-empty set of rules a spec violates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Returns `Ok(())` for an empty list so callers can `?` the result of a
    /// validation pass.
    pub(crate) fn check(errors: Vec<ValidationError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node pool specification has {} error(s):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Errors surfaced by a node pool provisioner
#[derive(Debug, derive_more::Display)]
pub enum ProvisionError {
    #[display("Failed to send node pool request: {message}")]
    Request { message: String },
    #[display("Node pool request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[display("Unexpected provisioner response: {message}")]
    InvalidResponse { message: String },
}

impl Error for ProvisionError {}

/// Errors surfaced by a manifest applier
#[derive(Debug, derive_more::Display)]
pub enum ApplyError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    Connection { message: String },
    #[display("Failed to load manifest source: {source}")]
    Source { source: String },
    #[display("Failed to parse manifest: {source}")]
    Parse { source: String },
    #[display("API discovery failed: {message}")]
    Discovery { message: String },
    #[display("Unknown resource kind {kind} in {source}")]
    UnknownKind { kind: String, source: String },
    #[display("Failed to apply {kind} {name}")]
    Apply { kind: String, name: String },
}

impl Error for ApplyError {}

/// Errors of the GPUDirect workload patch step
#[derive(Debug, derive_more::Display)]
pub enum PatchError {
    #[display("Workload manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },
    #[display("Failed to read workload manifest: {}", path.display())]
    ManifestRead { path: PathBuf },
    #[display("Failed to parse workload manifest: {}", path.display())]
    ManifestParse { path: PathBuf },
    #[display("Workload manifest has no pod template: {}", path.display())]
    NoPodTemplate { path: PathBuf },
    #[display("Failed to render patched workload")]
    Render,
    #[display("Failed to write patched workload: {}", path.display())]
    ManifestWrite { path: PathBuf },
}

impl Error for PatchError {}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn validation_error_messages_name_fields() {
        assert_eq!(
            ValidationError::LocalSsdConflict {
                ephemeral: 2,
                nvme_block: 4
            }
            .to_string(),
            "only one of local_ssd_count_ephemeral_storage (2) or local_ssd_count_nvme_block (4) may be set to a non-zero value"
        );
        assert_eq!(
            ValidationError::UnexpectedSpecificReservations {
                mode: ReservationType::AnyReservation,
                found: 1
            }
            .to_string(),
            "reservation_affinity: specific_reservations must be empty when consume_reservation_type is ANY_RESERVATION, found 1"
        );
        assert_eq!(
            ValidationError::InvalidClusterId {
                value: "c".to_string()
            }
            .to_string(),
            "cluster_id `c` must have the form projects/{project}/locations/{location}/clusters/{cluster}"
        );
    }

    #[test]
    fn validation_errors_lists_every_error() {
        let errors = ValidationErrors::check(vec![
            ValidationError::EmptyName,
            ValidationError::StaticWithInitial,
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "node pool specification has 2 error(s):\n  - name must not be empty\n  - static_node_count cannot be set together with initial_node_count"
        );
    }

    #[test]
    fn empty_validation_pass_is_ok() {
        assert!(ValidationErrors::check(Vec::new()).is_ok());
    }

    #[test]
    fn patch_error_display_includes_path() {
        let error = PatchError::ManifestNotFound {
            path: PathBuf::from("/tmp/job.yaml"),
        };
        assert_eq!(error.to_string(), "Workload manifest not found: /tmp/job.yaml");
    }
}
