//! Common facilities shared by GPU compute backends

#![allow(clippy::result_large_err)]

pub mod context;

use self::context::{config::VulkanConfig, VulkanContext};
use crate::{SimulateBase, SimulateCreate};
use data::coefficients::Coefficients;

/// GPU compute backend that can share its Vulkan context with other users
///
/// Creating multiple Vulkan contexts is expensive, and there is no easy way to
/// communicate between them. Front-ends that do other GPU work can therefore
/// specify their own requirements on the Vulkan context through this
/// interface, then use the simulation's context for their own purposes.
///
/// If you implement this, then `SimulateCreate` will be implemented for free.
pub trait SimulateGpu: SimulateBase {
    /// Variant of `SimulateCreate::new()` that also accepts a preliminary
    /// Vulkan context configuration
    ///
    /// Implementors should ensure that their final Vulkan configuration
    /// accepts a subset of the devices accepted by `config`.
    fn with_config(
        coefficients: &Coefficients,
        args: Self::CliArgs,
        config: VulkanConfig,
    ) -> Result<Self, Self::Error>;

    /// Access the Vulkan context used by the simulation
    fn context(&self) -> &VulkanContext;
}
//
impl<T: SimulateGpu> SimulateCreate for T {
    fn new(coefficients: &Coefficients, args: Self::CliArgs) -> Result<Self, Self::Error> {
        Self::with_config(coefficients, args, VulkanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::context::{ContextBuildError, ContextBuildResult};
    use super::*;
    use std::sync::Once;

    fn init_logger() {
        static INIT_LOGGER: Once = Once::new();
        INIT_LOGGER.call_once(env_logger::init);
    }

    #[test]
    fn setup_vulkan() -> ContextBuildResult<()> {
        init_logger();
        let result = VulkanConfig {
            enumerate_portability: true,
            ..VulkanConfig::default()
        }
        .build();
        match result {
            Ok(context) => context.pipeline_cache.write(),
            Err(ContextBuildError::Loading(_) | ContextBuildError::NoMatchingDevice) => {
                log::warn!("No usable Vulkan device on this machine, skipping test");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}
