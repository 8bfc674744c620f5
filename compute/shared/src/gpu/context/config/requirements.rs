//! Helpers for formulating device requirements

use vulkano::device::{physical::PhysicalDevice, Properties, QueueFlags};

/// Truth that a device has a queue that can run compute work
pub fn has_compute_queue(device: &PhysicalDevice) -> bool {
    device
        .queue_family_properties()
        .iter()
        .any(|family| family.queue_flags.contains(QueueFlags::COMPUTE))
}

/// Device requirements when a particular [width, height] work-group is used
pub fn for_work_group(properties: &Properties, [width, height]: [u32; 2]) -> bool {
    let Some(invocations) = width.checked_mul(height) else {
        return false;
    };
    properties.max_compute_work_group_invocations >= invocations
        && properties.max_compute_work_group_size[0] >= width
        && properties.max_compute_work_group_size[1] >= height
}

/// Device requirements when a particular dispatch size is used
pub fn for_dispatch(properties: &Properties, dispatch_size: [u32; 3]) -> bool {
    (properties.max_compute_work_group_count.into_iter())
        .zip(dispatch_size)
        .all(|(max, req)| max >= req)
}

/// Device requirements for binding a number of storage and uniform buffers in
/// a compute stage, over a certain number of descriptor sets
pub fn for_buffers(
    properties: &Properties,
    descriptor_sets: u32,
    storage_buffers: u32,
    uniform_buffers: u32,
) -> bool {
    properties.max_bound_descriptor_sets >= descriptor_sets
        && properties.max_per_stage_descriptor_storage_buffers >= storage_buffers
        && properties.max_per_stage_descriptor_uniform_buffers >= uniform_buffers
        && properties.max_per_stage_resources >= storage_buffers + uniform_buffers
}
