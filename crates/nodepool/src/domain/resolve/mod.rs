//! Resolvers for the independent parts of a node pool spec.
//!
//! Each resolver is a pure function over one slice of [`api_types::NodePoolSpec`]
//! and does not depend on the output of any other resolver; the descriptor
//! builder runs them all and merges their results.

pub mod accelerator;
pub mod reservation;
pub mod scaling;
pub mod storage;

pub use accelerator::resolve_accelerators;
pub use accelerator::AcceleratorResolution;
pub use reservation::resolve_reservation_affinity;
pub use reservation::RESERVATION_NAME_KEY;
pub use scaling::resolve_scaling_mode;
pub use scaling::ScalingRequest;
pub use storage::resolve_local_ssd;
