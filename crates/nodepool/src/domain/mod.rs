pub mod builder;
pub mod errors;
pub mod gpu_direct;
pub mod mock;
pub mod resolve;
pub mod traits;

// Re-export the types most callers need
pub use builder::NodePoolDescriptorBuilder;
pub use errors::ApplyError;
pub use errors::PatchError;
pub use errors::ProvisionError;
pub use errors::ValidationError;
pub use errors::ValidationErrors;
pub use gpu_direct::WorkloadPatcher;
pub use traits::ApplyTarget;
pub use traits::ManifestApplier;
pub use traits::ManifestSource;
pub use traits::NodePoolProvisioner;
pub use traits::ProvisionedNodePool;
