//! Vulkan context configuration

mod defaults;
pub mod requirements;

use super::{
    cache::PersistentPipelineCache,
    device,
    instance::{self, DebuggedInstance},
    ContextBuildError, ContextBuildResult, VulkanContext,
};
use directories::ProjectDirs;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{cmp::Ordering, sync::Arc};
use vulkano::{
    command_buffer::allocator::StandardCommandBufferAllocator,
    descriptor_set::allocator::StandardDescriptorSetAllocator,
    device::{physical::PhysicalDevice, Device, DeviceExtensions, Features, QueueCreateInfo},
    instance::InstanceExtensions,
    memory::allocator::StandardMemoryAllocator,
    VulkanLibrary,
};

/// Vulkan compute context configuration
///
/// A default configuration is provided via the [`default()`] method and
/// documented in the various fields of this struct. You can change these fields
/// to adjust the configuration, check out their documentation to see what their
/// default behavior is.
///
/// Once you're satisfied with the configuration, use the [`build()`] method
/// to set up the Vulkan context.
///
/// [`default()`]: VulkanConfig::default()
/// [`build()`]: VulkanConfig::build()
#[allow(clippy::type_complexity)]
pub struct VulkanConfig {
    /// Decide which Vulkan layers should be enabled
    ///
    /// Note that you can also use the `VK_INSTANCE_LAYERS` environment
    /// variable to activate layers.
    ///
    /// By default, "VK_LAYER_KHRONOS_validation" is enabled on debug builds.
    pub layers: Box<dyn FnOnce(&VulkanLibrary) -> Vec<String>>,

    /// Decide which instance extensions should be enabled
    ///
    /// By default, the ext_debug_utils extension is enabled when available, so
    /// that driver diagnostics end up in the application logs.
    pub instance_extensions: Box<dyn FnOnce(&VulkanLibrary) -> InstanceExtensions>,

    /// Truth that Vulkan Portability devices should be enumerated
    ///
    /// Some Vulkan implementations, like MoltenVK on macOS and iOS, do not
    /// support the full Vulkan 1.0 specification. By setting this flag, you
    /// enable these devices to be discovered.
    pub enumerate_portability: bool,

    /// Decide which device features and extensions should be enabled
    ///
    /// If the features and extensions that you return are not supported by a
    /// device, that device is discarded at enumeration time.
    ///
    /// By default, the khr_portability_subset extension is enabled on
    /// portability devices, and robust buffer access is enabled on debug
    /// builds so that kernel indexing bugs do not corrupt memory.
    pub device_features_extensions: Box<dyn FnMut(&PhysicalDevice) -> (Features, DeviceExtensions)>,

    /// Impose additional device requirements
    ///
    /// Return `true` to signify that a device meets your requirements. This is
    /// where compute backends check device limits. By default, no additional
    /// requirements are imposed.
    pub other_device_requirements: Box<dyn FnMut(&PhysicalDevice) -> bool>,

    /// Decide which device is best
    ///
    /// By default, we pick the device type which is most likely to exhibit
    /// maximal compute performance: discrete GPU, then virtual GPU, then
    /// integrated GPU, then CPU, then anything else.
    ///
    /// The `GRAYSCOTT_PREFER_DEVICE` environment variable can be set to
    /// "discrete", "integrated", "virtual", "cpu" or "other" in order to
    /// prefer another device type.
    pub device_preference: Box<dyn FnMut(&PhysicalDevice, &PhysicalDevice) -> Ordering>,

    /// Configure command queues
    ///
    /// The first queue must support compute operations, as that is the one
    /// that the simulation submits work to. By default, a single queue from
    /// the device's main compute-capable queue family is allocated.
    pub queues: Box<dyn FnOnce(&PhysicalDevice) -> Vec<QueueCreateInfo>>,

    /// Set up a memory allocator
    pub memory_allocator: Box<dyn FnOnce(Arc<Device>) -> StandardMemoryAllocator>,

    /// Set up a command buffer allocator
    pub command_allocator: Box<dyn FnOnce(Arc<Device>) -> StandardCommandBufferAllocator>,

    /// Set up a descriptor set allocator
    pub descriptor_set_allocator: Box<dyn FnOnce(Arc<Device>) -> StandardDescriptorSetAllocator>,
}
//
impl Default for VulkanConfig {
    /// Suggested defaults for all configuration items
    ///
    /// You can use struct update syntax to change only some settings, keeping
    /// the others to their default values:
    ///
    /// ```
    /// # use compute::gpu::context::config::VulkanConfig;
    /// let config = VulkanConfig {
    ///     enumerate_portability: true,
    ///     .. VulkanConfig::default()
    /// };
    /// ```
    fn default() -> Self {
        defaults::config()
    }
}
//
impl VulkanConfig {
    /// Set up a Vulkan compute context with this configuration
    pub fn build(mut self) -> ContextBuildResult<VulkanContext> {
        let library = instance::load_library()?;
        let instance_extensions = (self.instance_extensions)(&library);
        let layers = (self.layers)(&library);
        let instance = DebuggedInstance::new(
            library,
            layers,
            instance_extensions,
            self.enumerate_portability,
        )?;

        let physical_device = device::select_physical(
            &instance,
            &mut self.device_features_extensions,
            self.other_device_requirements,
            self.device_preference,
        )?;
        let (features, extensions) = (self.device_features_extensions)(&physical_device);
        let (device, queues) = device::create_logical(
            physical_device.clone(),
            features,
            extensions,
            (self.queues)(&physical_device),
        )?;

        let memory_allocator = Arc::new((self.memory_allocator)(device.clone()));
        let command_allocator = Arc::new((self.command_allocator)(device.clone()));
        let descriptor_set_allocator = Arc::new((self.descriptor_set_allocator)(device.clone()));

        let dirs =
            ProjectDirs::from("", "", "grayscott").ok_or(ContextBuildError::HomeDirNotFound)?;
        let pipeline_cache = PersistentPipelineCache::new(&dirs, device.clone())?;

        Ok(VulkanContext {
            _messenger: instance._messenger,
            device,
            queues,
            memory_allocator,
            command_allocator,
            descriptor_set_allocator,
            pipeline_cache,
        })
    }
}
