//! Compiled simulation kernels and their GPU bindings

use crate::{
    parameters::{self, GpuParameters, Parameters},
    source, Error, Result,
};
use compute::gpu::context::VulkanContext;
use crevice::std140::AsStd140;
use data::{
    coefficients::Coefficients,
    edge::EdgeMode,
    field::gpu::BufferField,
};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use shaderc::{CompileOptions, Compiler, OptimizationLevel, ShaderKind, SourceLanguage};
use std::sync::Arc;
use vulkano::{
    buffer::Subbuffer,
    command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    pipeline::{
        compute::ComputePipelineCreateInfo, layout::PipelineDescriptorSetLayoutCreateInfo,
        ComputePipeline, Pipeline, PipelineBindPoint, PipelineLayout,
        PipelineShaderStageCreateInfo,
    },
    shader::{ShaderModule, ShaderModuleCreateInfo},
};

/// Descriptor set to which the input and output fields are bound
const FIELDS_SET: u32 = 0;

/// Descriptor within `FIELDS_SET` for the input field
const IN_FIELD: u32 = 0;

/// Descriptor within `FIELDS_SET` for the output field
const OUT_FIELD: u32 = 1;

/// Descriptor set to which the simulation parameters are bound
const PARAMS_SET: u32 = 1;

/// Descriptor within `PARAMS_SET` for the simulation parameters
const PARAMS: u32 = 0;

/// Number of descriptor sets used by the kernel
pub(crate) const NUM_SETS: u32 = 2;

/// Number of storage buffers used by the kernel
pub(crate) const NUM_STORAGE_BUFFERS: u32 = 2;

/// Number of uniform buffers used by the kernel
pub(crate) const NUM_UNIFORM_BUFFERS: u32 = 1;

/// GLSL to SPIR-V compiler
pub struct KernelCompiler {
    compiler: Compiler,
    options: CompileOptions<'static>,
}
//
impl KernelCompiler {
    /// Set up the compiler
    pub fn new() -> Result<Self> {
        let compiler = Compiler::new().ok_or(Error::CompilerInit)?;
        let mut options = CompileOptions::new().ok_or(Error::CompilerInit)?;
        options.set_source_language(SourceLanguage::GLSL);
        if cfg!(debug_assertions) {
            options.set_generate_debug_info();
        } else {
            options.set_optimization_level(OptimizationLevel::Performance);
        }
        Ok(Self { compiler, options })
    }

    /// Compile GLSL source into SPIR-V words
    fn compile(&self, source: &str) -> Result<Vec<u32>> {
        let artifact = self.compiler.compile_into_spirv(
            source,
            ShaderKind::Compute,
            "kernel.comp",
            "main",
            Some(&self.options),
        )?;
        if artifact.get_num_warnings() > 0 {
            warn!("Kernel compiled with warnings: {}", artifact.get_warning_messages());
        }
        Ok(artifact.as_binary().to_vec())
    }
}

/// Simulation kernel compiled for one mask layout
///
/// Owns the compute pipeline, the parameters buffer, and the descriptor set
/// that binds it.
pub struct CompiledKernel {
    /// Compute pipeline
    pipeline: Arc<ComputePipeline>,

    /// Simulation parameters
    uniforms: Subbuffer<GpuParameters>,

    /// Descriptor set that binds `uniforms`
    uniform_set: Arc<PersistentDescriptorSet>,
}
//
impl CompiledKernel {
    /// Generate and compile a kernel for the masks of some coefficients
    pub fn new(
        context: &VulkanContext,
        compiler: &KernelCompiler,
        coefficients: &Coefficients,
        work_group: [u32; 2],
    ) -> Result<Self> {
        let masks = coefficients.masks();
        let source = source::generate(masks, work_group)?;
        trace!("Generated kernel source:\n{source}");
        let words = compiler.compile(&source)?;

        let device = &context.device;
        // SAFETY: The SPIR-V was just produced by shaderc from GLSL that
        //         does not use any feature the device was not checked for.
        let module =
            unsafe { ShaderModule::new(device.clone(), ShaderModuleCreateInfo::new(&words))? };
        let entry_point = module.entry_point("main").ok_or(Error::MissingEntryPoint)?;
        let stage = PipelineShaderStageCreateInfo::new(entry_point);
        let pipeline_layout = PipelineLayout::new(
            device.clone(),
            PipelineDescriptorSetLayoutCreateInfo::from_stages([&stage])
                .into_pipeline_layout_create_info(device.clone())?,
        )?;
        let pipeline = ComputePipeline::new(
            device.clone(),
            Some(context.pipeline_cache.clone()),
            ComputePipelineCreateInfo::stage_layout(stage, pipeline_layout),
        )?;

        // Actual values are written before each batch of steps
        let uniforms = parameters::expose(
            context,
            &Parameters::new(coefficients, [0, 0], EdgeMode::default()),
        )?;
        let uniform_set = PersistentDescriptorSet::new(
            context.descriptor_set_allocator.as_ref(),
            pipeline.layout().set_layouts()[PARAMS_SET as usize].clone(),
            [WriteDescriptorSet::buffer(PARAMS, uniforms.clone())],
            [],
        )?;

        Ok(Self {
            pipeline,
            uniforms,
            uniform_set,
        })
    }

    /// Update the simulation parameters
    ///
    /// Must not be called while previously submitted steps are executing.
    pub fn write_uniforms(
        &self,
        coefficients: &Coefficients,
        shape: [usize; 2],
        edge_mode: EdgeMode,
    ) -> Result<()> {
        *self.uniforms.write()? = Parameters::new(coefficients, shape, edge_mode).as_std140();
        Ok(())
    }

    /// Descriptor sets for both step directions of a field pair
    ///
    /// Element `i` reads slot `i` and writes the other slot.
    pub fn field_sets(
        &self,
        context: &VulkanContext,
        slots: &[BufferField; 2],
    ) -> Result<[Arc<PersistentDescriptorSet>; 2]> {
        let layout = self.pipeline.layout().set_layouts()[FIELDS_SET as usize].clone();
        let make_set = |input: &BufferField, output: &BufferField| {
            PersistentDescriptorSet::new(
                context.descriptor_set_allocator.as_ref(),
                layout.clone(),
                [
                    WriteDescriptorSet::buffer(IN_FIELD, input.buffer().clone()),
                    WriteDescriptorSet::buffer(OUT_FIELD, output.buffer().clone()),
                ],
                [],
            )
        };
        Ok([
            make_set(&slots[0], &slots[1])?,
            make_set(&slots[1], &slots[0])?,
        ])
    }

    /// Bind the pipeline and its parameters
    pub fn bind(&self, builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>) -> Result<()> {
        builder
            .bind_pipeline_compute(self.pipeline.clone())?
            .bind_descriptor_sets(
                PipelineBindPoint::Compute,
                self.pipeline.layout().clone(),
                PARAMS_SET,
                self.uniform_set.clone(),
            )?;
        Ok(())
    }

    /// Record one simulation step
    pub fn record_step(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        fields: Arc<PersistentDescriptorSet>,
        dispatch_size: [u32; 3],
    ) -> Result<()> {
        builder
            .bind_descriptor_sets(
                PipelineBindPoint::Compute,
                self.pipeline.layout().clone(),
                FIELDS_SET,
                fields,
            )?
            .dispatch(dispatch_size)?;
        Ok(())
    }
}
//
impl Drop for CompiledKernel {
    fn drop(&mut self) {
        debug!(
            "Releasing compute pipeline and {} bytes of parameters",
            self.uniforms.size()
        );
    }
}

/// Number of work-groups needed to cover a field of a certain shape
pub fn dispatch_size([rows, cols]: [usize; 2], [width, height]: [u32; 2]) -> Option<[u32; 3]> {
    let groups = |len: usize, group: u32| u32::try_from(len.div_ceil(group as usize)).ok();
    Some([groups(cols, width)?, groups(rows, height)?, 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_field() {
        assert_eq!(dispatch_size([64, 64], [8, 8]), Some([8, 8, 1]));
        assert_eq!(dispatch_size([10, 30], [8, 4]), Some([4, 3, 1]));
        assert_eq!(dispatch_size([1, 1], [16, 16]), Some([1, 1, 1]));
    }
}
