//! Device selection and setup

use super::{ContextBuildError, ContextBuildResult};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{cmp::Ordering, sync::Arc};
use vulkano::{
    device::{
        physical::PhysicalDevice, Device, DeviceCreateInfo, DeviceExtensions, Features, Queue,
        QueueCreateInfo,
    },
    instance::Instance,
};

/// Pick a physical device to run the simulation on
///
/// The simulation only ever runs on a single device. Among the devices that
/// support the features and extensions requested by `features_extensions` and
/// pass the `other_requirements` check, the one that `preference` ranks
/// highest is selected. Ties go to the device that was enumerated first.
pub fn select_physical(
    instance: &Arc<Instance>,
    mut features_extensions: impl FnMut(&PhysicalDevice) -> (Features, DeviceExtensions),
    mut other_requirements: impl FnMut(&PhysicalDevice) -> bool,
    mut preference: impl FnMut(&PhysicalDevice, &PhysicalDevice) -> Ordering,
) -> ContextBuildResult<Arc<PhysicalDevice>> {
    let selected_device = instance
        .enumerate_physical_devices()?
        .filter(|device| {
            let properties = device.properties();
            info!(
                "Found {:?} physical device {}",
                properties.device_type, properties.device_name
            );
            trace!("- With {properties:#?}");
            trace!(
                "- With device extensions {}",
                super::format_extension_properties(device.extension_properties())
            );
            trace!(
                "- With queue families {:#?}",
                device.queue_family_properties()
            );

            let (features, extensions) = features_extensions(device);
            let can_use = device.supported_features().contains(&features)
                && device.supported_extensions().contains(&extensions)
                && other_requirements(device);
            if can_use {
                info!("=> Device meets requirements");
            } else {
                info!("=> Device does NOT meet requirements");
            }
            can_use
        })
        // Using minimum ensures we pick the first device given equal preference
        .min_by(|a, b| preference(a, b).reverse());
    match selected_device {
        Some(device) => {
            info!("Selected device {}", device.properties().device_name);
            Ok(device)
        }
        None => Err(ContextBuildError::NoMatchingDevice),
    }
}

/// Create a logical device and associated command queues
///
/// This is the point where optional core Vulkan features and extensions are
/// enabled, and where the desired queue configuration is specified.
pub fn create_logical(
    physical_device: Arc<PhysicalDevice>,
    enabled_features: Features,
    enabled_extensions: DeviceExtensions,
    queue_create_infos: Vec<QueueCreateInfo>,
) -> ContextBuildResult<(Arc<Device>, Box<[Arc<Queue>]>)> {
    let create_info = DeviceCreateInfo {
        enabled_features,
        enabled_extensions,
        queue_create_infos,
        ..Default::default()
    };
    info!("Will now create a logical device with {create_info:#?}");
    let (device, queues) = Device::new(physical_device, create_info)?;
    Ok((device, queues.collect()))
}
