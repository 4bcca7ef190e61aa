//! GPUDirect (TCPX / TCPXO) workload patching.

mod patcher;
mod profile;

pub use patcher::WorkloadPatcher;
