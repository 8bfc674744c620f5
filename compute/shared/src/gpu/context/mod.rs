//! Vulkan context shared by the GPU simulation and its clients

mod cache;
pub mod config;
mod device;
mod instance;

use self::cache::PersistentPipelineCache;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::sync::Arc;
use thiserror::Error;
use vulkano::{
    command_buffer::allocator::StandardCommandBufferAllocator,
    descriptor_set::allocator::StandardDescriptorSetAllocator,
    device::{Device, Queue},
    instance::debug::DebugUtilsMessenger,
    memory::allocator::StandardMemoryAllocator,
    ExtensionProperties, LoadingError, Validated, ValidationError, VulkanError,
};

/// Vulkan compute context
///
/// Common setup you need in order to perform any useful computation with
/// Vulkan. Designed to make the easy case easy, while enabling sufficient
/// tweaking and debugging when needed.
///
/// Keep this struct alive as long as you're using Vulkan, as that's how long
/// debug logging is going to keep printing useful info ;)
///
/// Built using the [`config::VulkanConfig`] configuration struct
pub struct VulkanContext {
    /// Logical device (used for resource allocation)
    pub device: Arc<Device>,

    /// Command queues (used for command submission)
    pub queues: Box<[Arc<Queue>]>,

    /// Memory allocator (used for buffer allocation)
    pub memory_allocator: Arc<StandardMemoryAllocator>,

    /// Command buffer allocator
    pub command_allocator: Arc<StandardCommandBufferAllocator>,

    /// Descriptor set allocator
    pub descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,

    /// Pipeline cache (used for e.g. compiled kernel caching)
    pub pipeline_cache: PersistentPipelineCache,

    /// Messenger that sends Vulkan debug messages to the [`log`] crate
    pub(crate) _messenger: Option<DebugUtilsMessenger>,
}
//
impl VulkanContext {
    /// Main command queue, which supports compute operations
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queues[0]
    }
}

/// Things that can go wrong while setting up a VulkanContext
#[derive(Debug, Error)]
pub enum ContextBuildError {
    #[error("failed to load the Vulkan library")]
    Loading(#[from] LoadingError),

    #[error("no physical device matches requirements")]
    NoMatchingDevice,

    #[error("a Vulkan API call errored out or failed validation ({0})")]
    Vulkan(#[from] Validated<VulkanError>),

    #[error("did not find home directory")]
    HomeDirNotFound,

    #[error("failed to read or write on-disk pipeline cache")]
    PipelineCacheIo(#[from] std::io::Error),
}
//
impl From<VulkanError> for ContextBuildError {
    fn from(value: VulkanError) -> Self {
        Self::Vulkan(Validated::Error(value))
    }
}
//
impl From<Box<ValidationError>> for ContextBuildError {
    fn from(value: Box<ValidationError>) -> Self {
        Self::Vulkan(value.into())
    }
}
//
/// Result type associated with VulkanContext setup issues
pub type ContextBuildResult<T> = std::result::Result<T, ContextBuildError>;

/// Format Vulkan extension properties for display
fn format_extension_properties(extension_properties: &[ExtensionProperties]) -> String {
    format!(
        "{:#?}",
        extension_properties
            .iter()
            .map(|ext| format!("{} v{}", ext.extension_name, ext.spec_version))
            .collect::<Vec<_>>()
    )
}
