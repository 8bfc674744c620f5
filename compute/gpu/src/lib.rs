//! GPU implementation of the masked Gray-Scott simulation
//!
//! The simulation kernel is generated at runtime from a GLSL template, where
//! each coefficient's mask is spliced in as a GLSL expression. The resulting
//! kernel only evaluates the masks that are actually in use, and a Solid
//! coefficient costs no more than a uniform load. Changing a coefficient's
//! value range only rewrites the kernel parameters, while changing a mask
//! triggers the generation and compilation of a new kernel.
//!
//! The field lives in a pair of storage buffers, and all the steps of a
//! batch are recorded into a single command buffer, relying on vulkano to
//! insert the barriers that keep each step behind the previous one.

#![allow(clippy::result_large_err)]

pub mod parameters;
mod program;
pub mod source;
pub mod template;

use self::{
    program::{CompiledKernel, KernelCompiler},
    template::TemplateError,
};
use clap::Args;
use compute::{
    gpu::{
        context::{
            config::{requirements, VulkanConfig},
            ContextBuildError, VulkanContext,
        },
        SimulateGpu,
    },
    kernel::{KernelCache, KernelId, KernelUpdate},
    Simulate, SimulateBase,
};
use data::{
    cell::Cell,
    coefficients::Coefficients,
    edge::EdgeMode,
    field::{
        gpu::{BufferContext, BufferField},
        FieldPair,
    },
};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{num::NonZeroU32, sync::Arc};
use thiserror::Error;
use vulkano::{
    buffer::AllocateBufferError,
    command_buffer::{AutoCommandBufferBuilder, CommandBufferExecError, CommandBufferUsage},
    descriptor_set::PersistentDescriptorSet,
    device::physical::PhysicalDevice,
    pipeline::layout::IntoPipelineLayoutCreateInfoError,
    sync::{self, GpuFuture, HostAccessError},
    Validated, ValidationError, VulkanError,
};

/// CLI parameters of the GPU compute backend
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct CliArgs {
    /// Number of columns processed by each GPU work group during simulation
    #[arg(long, env, default_value_t = NonZeroU32::new(8).unwrap())]
    pub compute_work_group_cols: NonZeroU32,

    /// Number of rows processed by each GPU work group during simulation
    #[arg(long, env, default_value_t = NonZeroU32::new(8).unwrap())]
    pub compute_work_group_rows: NonZeroU32,
}
//
impl Default for CliArgs {
    fn default() -> Self {
        let eight = NonZeroU32::new(8).expect("8 is not zero");
        Self {
            compute_work_group_cols: eight,
            compute_work_group_rows: eight,
        }
    }
}

/// Masked Gray-Scott reaction simulation on the GPU
pub struct Simulation {
    /// General-purpose Vulkan context
    context: VulkanContext,

    /// GLSL to SPIR-V compiler
    compiler: KernelCompiler,

    /// Work-group shape as [width, height]
    work_group: [u32; 2],

    /// Kernel specialized for the current coefficient masks
    kernels: KernelCache<CompiledKernel>,

    /// Latest coefficients
    coefficients: Coefficients,

    /// Field descriptor sets of the last simulated field pair
    field_sets: Option<FieldSets>,
}
//
/// Descriptor sets binding the slots of a field pair to a kernel
struct FieldSets {
    kernel: KernelId,
    generation: u64,
    sets: [Arc<PersistentDescriptorSet>; 2],
}
//
impl SimulateBase for Simulation {
    type CliArgs = CliArgs;

    type Field = BufferField;

    type Error = Error;

    fn make_field_pair(&self, shape: [usize; 2]) -> Result<FieldPair<BufferField>> {
        let max_size = self.max_field_size();
        if shape.iter().any(|&len| len == 0 || len > max_size) {
            return Err(Error::UnsupportedShape(shape));
        }
        Ok(FieldPair::new(
            BufferContext::new(self.context.memory_allocator.clone()),
            shape,
        )?)
    }

    fn max_field_size(&self) -> usize {
        let properties = self.context.device.physical_device().properties();
        let max_cells = properties.max_storage_buffer_range as f64 / std::mem::size_of::<Cell>() as f64;
        let by_buffer = max_cells.sqrt() as u64;
        let [groups_x, groups_y, _] = properties.max_compute_work_group_count;
        let [width, height] = self.work_group;
        let by_dispatch =
            (u64::from(groups_x) * u64::from(width)).min(u64::from(groups_y) * u64::from(height));
        usize::try_from(by_buffer.min(by_dispatch)).unwrap_or(usize::MAX)
    }
}
//
impl SimulateGpu for Simulation {
    fn with_config(
        coefficients: &Coefficients,
        args: CliArgs,
        mut config: VulkanConfig,
    ) -> Result<Self> {
        let work_group = [
            args.compute_work_group_cols.get(),
            args.compute_work_group_rows.get(),
        ];
        let context = VulkanConfig {
            other_device_requirements: Box::new(move |device| {
                (config.other_device_requirements)(device)
                    && Self::device_requirements(device, work_group)
            }),
            ..config
        }
        .build()?;
        let compiler = KernelCompiler::new()?;
        let kernels = KernelCache::new(coefficients, |coefficients| {
            CompiledKernel::new(&context, &compiler, coefficients, work_group)
        })?;
        Ok(Self {
            context,
            compiler,
            work_group,
            kernels,
            coefficients: *coefficients,
            field_sets: None,
        })
    }

    fn context(&self) -> &VulkanContext {
        &self.context
    }
}
//
impl Simulate for Simulation {
    fn update_coefficients(&mut self, coefficients: &Coefficients) -> Result<()> {
        let update = self.kernels.update(coefficients, |coefficients| {
            CompiledKernel::new(&self.context, &self.compiler, coefficients, self.work_group)
        })?;
        if let KernelUpdate::Compiled(_) = update {
            self.field_sets = None;
        }
        self.coefficients = *coefficients;
        Ok(())
    }

    fn kernel_id(&self) -> KernelId {
        self.kernels.id()
    }

    fn perform_steps(
        &mut self,
        field: &mut FieldPair<BufferField>,
        edge_mode: EdgeMode,
        steps: usize,
    ) -> Result<()> {
        if steps == 0 {
            return Ok(());
        }
        let shape = field.shape();
        let properties = self.context.device.physical_device().properties();
        let dispatch_size = program::dispatch_size(shape, self.work_group)
            .filter(|&size| requirements::for_dispatch(properties, size))
            .ok_or(Error::UnsupportedShape(shape))?;

        // Update kernel parameters, then fetch or create field bindings
        let (kernel_id, kernel) = self.kernels.get();
        kernel.write_uniforms(&self.coefficients, shape, edge_mode)?;
        let generation = field.generation();
        let sets = match &self.field_sets {
            Some(cached) if cached.kernel == kernel_id && cached.generation == generation => {
                cached.sets.clone()
            }
            _ => {
                debug!("Binding field pair #{generation} to {kernel_id}");
                let sets = kernel.field_sets(&self.context, field.slots())?;
                self.field_sets = Some(FieldSets {
                    kernel: kernel_id,
                    generation,
                    sets: sets.clone(),
                });
                sets
            }
        };

        // Record the simulation steps
        let queue = self.context.queue().clone();
        let mut builder = AutoCommandBufferBuilder::primary(
            self.context.command_allocator.as_ref(),
            queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )?;
        kernel.bind(&mut builder)?;
        let mut current = field.current_index();
        for _ in 0..steps {
            kernel.record_step(&mut builder, sets[current].clone(), dispatch_size)?;
            current = 1 - current;
        }
        let commands = builder.build()?;

        // Synchronously execute the simulation steps
        sync::now(self.context.device.clone())
            .then_execute(queue, commands)?
            .then_signal_fence_and_flush()?
            .wait(None)?;
        if steps % 2 == 1 {
            field.swap();
        }
        Ok(())
    }
}
//
impl Simulation {
    /// Check device requirements for this backend
    fn device_requirements(device: &PhysicalDevice, work_group: [u32; 2]) -> bool {
        let properties = device.properties();
        requirements::has_compute_queue(device)
            && requirements::for_work_group(properties, work_group)
            && requirements::for_buffers(
                properties,
                program::NUM_SETS,
                program::NUM_STORAGE_BUFFERS,
                program::NUM_UNIFORM_BUFFERS,
            )
            && properties.max_uniform_buffer_range as usize
                >= std::mem::size_of::<parameters::GpuParameters>()
    }
}

/// Errors that can occur during this computation
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to set up the Vulkan context")]
    Context(#[from] ContextBuildError),

    #[error("failed to initialize the GLSL compiler")]
    CompilerInit,

    #[error("failed to generate the kernel source")]
    Template(#[from] TemplateError),

    #[error("failed to compile the kernel to SPIR-V")]
    Compile(#[from] shaderc::Error),

    #[error("compiled kernel has no main entry point")]
    MissingEntryPoint,

    #[error("failed to derive the kernel's pipeline layout")]
    PipelineLayout(#[from] IntoPipelineLayoutCreateInfoError),

    #[error("a Vulkan API call errored out or failed validation")]
    Vulkan(#[from] Validated<VulkanError>),

    #[error("a command failed validation")]
    Validation(#[from] Box<ValidationError>),

    #[error("failed to allocate the kernel parameters")]
    ParamsAllocation(#[from] Validated<AllocateBufferError>),

    #[error("failed to update the kernel parameters")]
    ParamsAccess(#[from] HostAccessError),

    #[error("failed to submit commands to the queue")]
    CommandBufferExec(#[from] CommandBufferExecError),

    #[error("failed to manipulate a field")]
    Field(#[from] data::field::gpu::Error),

    #[error("device does not support field shape {0:?}")]
    UnsupportedShape([usize; 2]),
}
//
pub type Result<T, E = Error> = std::result::Result<T, E>;
