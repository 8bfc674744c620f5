//! Default Vulkan context configuration

use super::VulkanConfig;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{cmp::Ordering, env::VarError, sync::Arc};
use vulkano::{
    command_buffer::allocator::{
        StandardCommandBufferAllocator, StandardCommandBufferAllocatorCreateInfo,
    },
    descriptor_set::allocator::{
        StandardDescriptorSetAllocator, StandardDescriptorSetAllocatorCreateInfo,
    },
    device::{
        physical::{PhysicalDevice, PhysicalDeviceType},
        Device, DeviceExtensions, Features, QueueCreateInfo, QueueFlags,
    },
    instance::InstanceExtensions,
    memory::allocator::StandardMemoryAllocator,
    VulkanLibrary,
};

/// Environment variable used to override the preferred device type
const PREFER_DEVICE_VAR: &str = "GRAYSCOTT_PREFER_DEVICE";

/// Suggested VulkanConfig
pub fn config() -> VulkanConfig {
    VulkanConfig {
        layers: Box::new(layers),
        instance_extensions: Box::new(instance_extensions),
        enumerate_portability: false,
        device_features_extensions: Box::new(device_features_extensions),
        other_device_requirements: Box::new(|_| true),
        device_preference: Box::new(device_preference),
        queues: Box::new(queues),
        memory_allocator: Box::new(StandardMemoryAllocator::new_default),
        command_allocator: Box::new(|device: Arc<Device>| {
            StandardCommandBufferAllocator::new(
                device,
                StandardCommandBufferAllocatorCreateInfo::default(),
            )
        }),
        descriptor_set_allocator: Box::new(|device: Arc<Device>| {
            StandardDescriptorSetAllocator::new(
                device,
                StandardDescriptorSetAllocatorCreateInfo::default(),
            )
        }),
    }
}

/// Suggested set of instance layers
fn layers(library: &VulkanLibrary) -> Vec<String> {
    const VALIDATION: &str = "VK_LAYER_KHRONOS_validation";
    let available = library
        .layer_properties()
        .map(|mut layers| layers.any(|layer| layer.name() == VALIDATION))
        .unwrap_or(false);
    if cfg!(debug_assertions) && available {
        vec![VALIDATION.to_owned()]
    } else {
        vec![]
    }
}

/// Suggested set of instance extensions
fn instance_extensions(library: &VulkanLibrary) -> InstanceExtensions {
    InstanceExtensions {
        ext_debug_utils: library.supported_extensions().ext_debug_utils,
        ..Default::default()
    }
}

/// Suggested device features and extensions
fn device_features_extensions(device: &PhysicalDevice) -> (Features, DeviceExtensions) {
    let mut features = Features::empty();
    let mut extensions = DeviceExtensions::empty();
    if cfg!(debug_assertions) && device.supported_features().robust_buffer_access {
        features.robust_buffer_access = true;
    }
    if device.supported_extensions().khr_portability_subset {
        extensions.khr_portability_subset = true;
    }
    (features, extensions)
}

/// Suggested device preference
fn device_preference(device1: &PhysicalDevice, device2: &PhysicalDevice) -> Ordering {
    let preferred_device_type = match std::env::var(PREFER_DEVICE_VAR) {
        Ok(string) => match string.as_str() {
            "" | "discrete" => PhysicalDeviceType::DiscreteGpu,
            "integrated" => PhysicalDeviceType::IntegratedGpu,
            "virtual" => PhysicalDeviceType::VirtualGpu,
            "cpu" => PhysicalDeviceType::Cpu,
            "other" => PhysicalDeviceType::Other,
            unknown => {
                warn!("Ignoring unknown device type {unknown:?} in {PREFER_DEVICE_VAR}");
                PhysicalDeviceType::DiscreteGpu
            }
        },
        Err(VarError::NotPresent) => PhysicalDeviceType::DiscreteGpu,
        Err(VarError::NotUnicode(s)) => {
            warn!("Ignoring non-unicode {PREFER_DEVICE_VAR} value {s:?}");
            PhysicalDeviceType::DiscreteGpu
        }
    };
    let device_type_score = |device: &PhysicalDevice| match device.properties().device_type {
        x if x == preferred_device_type => 6,
        PhysicalDeviceType::DiscreteGpu => 5,
        PhysicalDeviceType::VirtualGpu => 4,
        PhysicalDeviceType::IntegratedGpu => 3,
        PhysicalDeviceType::Cpu => 2,
        PhysicalDeviceType::Other => 1,
        _ => 0,
    };
    device_type_score(device1).cmp(&device_type_score(device2))
}

/// Suggested single-queue creation info
///
/// Picks one queue with compute support, preferring families that also
/// support graphics as those are most likely to be the device's main family.
/// Devices without a compute queue get no queue at all, and are expected to be
/// rejected by the device requirements.
fn queues(device: &PhysicalDevice) -> Vec<QueueCreateInfo> {
    device
        .queue_family_properties()
        .iter()
        .enumerate()
        .filter(|(_idx, family)| family.queue_flags.contains(QueueFlags::COMPUTE))
        .min_by_key(|(idx, family)| (!family.queue_flags.contains(QueueFlags::GRAPHICS), *idx))
        .map(|(idx, _family)| QueueCreateInfo {
            queue_family_index: idx as u32,
            ..Default::default()
        })
        .into_iter()
        .collect()
}
