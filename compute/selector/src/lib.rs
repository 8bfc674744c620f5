//! Pick the best compute backend allowed by enabled crate features, expose it
//! as a Simulation typedef.
//!
//! The CPU backend is always available, so that the engine can run on
//! machines without a Vulkan implementation.

cfg_if::cfg_if! {
    if #[cfg(feature = "gpu")] {
        pub type Simulation = compute_gpu::Simulation;
    } else {
        pub type Simulation = compute_cpu::Simulation;
    }
}
