//! Vulkan library loading and instance setup

use super::ContextBuildResult;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{ops::Deref, sync::Arc};
use vulkano::{
    instance::{
        debug::{
            DebugUtilsMessageSeverity, DebugUtilsMessageType, DebugUtilsMessenger,
            DebugUtilsMessengerCallback, DebugUtilsMessengerCallbackData,
            DebugUtilsMessengerCreateInfo,
        },
        Instance, InstanceCreateFlags, InstanceCreateInfo, InstanceExtensions,
    },
    VulkanLibrary,
};

/// Load the Vulkan library
pub fn load_library() -> ContextBuildResult<Arc<VulkanLibrary>> {
    let library = VulkanLibrary::new()?;
    info!("Loaded Vulkan library supporting Vulkan v{}", library.api_version());
    trace!(
        "- Supports instance extensions {}",
        super::format_extension_properties(library.extension_properties())
    );
    trace!(
        "- Supports layers {:?}",
        library
            .layer_properties()?
            .map(|layer| format!("{} v{}", layer.name(), layer.implementation_version()))
            .collect::<Vec<_>>()
    );
    Ok(library)
}

/// Vulkan instance whose debug messages are forwarded to the `log` crate
///
/// Logging stops once this struct is dropped, even if other `Arc<Instance>`
/// remain in flight.
pub struct DebuggedInstance {
    /// Vulkan instance
    instance: Arc<Instance>,

    /// Messenger that logs instance debug messages
    pub(super) _messenger: Option<DebugUtilsMessenger>,
}
//
impl DebuggedInstance {
    /// Set up a Vulkan instance with certain layers and extensions
    ///
    /// Setting `enumerate_portability` makes devices that do not fully conform
    /// to the Vulkan specification, like MoltenVK, visible. Device requirements
    /// must then account for the possible absence of some core features.
    pub fn new(
        library: Arc<VulkanLibrary>,
        enabled_layers: Vec<String>,
        enabled_extensions: InstanceExtensions,
        enumerate_portability: bool,
    ) -> ContextBuildResult<Self> {
        let unsupported_extensions = *library.supported_extensions()
            - library
                .supported_extensions_with_layers(enabled_layers.iter().map(String::as_ref))?;
        if unsupported_extensions != InstanceExtensions::empty() {
            debug!(
                "Selected layer(s) {enabled_layers:?} do NOT support extensions {unsupported_extensions:#?}"
            );
        }

        let messenger_info = enabled_extensions
            .ext_debug_utils
            .then(Self::messenger_info);
        let mut flags = InstanceCreateFlags::default();
        if enumerate_portability {
            flags |= InstanceCreateFlags::ENUMERATE_PORTABILITY;
        }
        let create_info = InstanceCreateInfo {
            flags,
            enabled_extensions,
            enabled_layers,
            debug_utils_messengers: messenger_info.clone().into_iter().collect(),
            ..InstanceCreateInfo::application_from_cargo_toml()
        };
        info!("Will now create a Vulkan instance with {create_info:#?}");
        let instance = Instance::new(library, create_info)?;

        let _messenger = messenger_info
            .map(|info| DebugUtilsMessenger::new(instance.clone(), info))
            .transpose()?;
        Ok(Self {
            instance,
            _messenger,
        })
    }

    /// Debug messenger configuration that matches the active log level
    fn messenger_info() -> DebugUtilsMessengerCreateInfo {
        type Severity = DebugUtilsMessageSeverity;
        type Type = DebugUtilsMessageType;
        let mut message_severity = Severity::empty();
        for (severity, level) in [
            (Severity::ERROR, log::Level::Error),
            (Severity::WARNING, log::Level::Warn),
            (Severity::INFO, log::Level::Debug),
            (Severity::VERBOSE, log::Level::Trace),
        ] {
            if log::STATIC_MAX_LEVEL >= level {
                message_severity |= severity;
            }
        }
        let mut message_type = Type::GENERAL;
        if cfg!(debug_assertions) {
            message_type |= Type::VALIDATION | Type::PERFORMANCE;
        }
        let info = DebugUtilsMessengerCreateInfo {
            message_severity,
            message_type,
            // SAFETY: The callback does not call into Vulkan
            ..DebugUtilsMessengerCreateInfo::user_callback(unsafe {
                DebugUtilsMessengerCallback::new(log_message)
            })
        };
        debug!("Setting up debug utils with {info:#?}");
        info
    }
}
//
impl Deref for DebuggedInstance {
    type Target = Arc<Instance>;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

/// Forward a Vulkan debug message to the `log` crate
fn log_message(
    severity: DebugUtilsMessageSeverity,
    ty: DebugUtilsMessageType,
    data: DebugUtilsMessengerCallbackData<'_>,
) {
    let level = match severity {
        DebugUtilsMessageSeverity::ERROR => log::Level::Error,
        DebugUtilsMessageSeverity::WARNING => log::Level::Warn,
        DebugUtilsMessageSeverity::INFO => log::Level::Debug,
        DebugUtilsMessageSeverity::VERBOSE => log::Level::Trace,
        _ => log::Level::Info,
    };
    if level > log::max_level() {
        return;
    }
    let target = match data.message_id_name {
        Some(id_name) => format!("Vulkan {ty:?} {id_name}"),
        None => format!("Vulkan {ty:?}"),
    };
    let objects = data
        .objects
        .map(|obj| match obj.object_name {
            Some(name) => format!("{:?} #{} \"{name}\"", obj.object_type, obj.object_handle),
            None => format!("{:?} #{}", obj.object_type, obj.object_handle),
        })
        .collect::<Vec<_>>();
    log!(
        target: &target,
        level,
        "{} (id: {}, objects: {objects:?})",
        data.message,
        data.message_id_number,
    );
}
