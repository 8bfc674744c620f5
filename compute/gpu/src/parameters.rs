//! Simulation parameters

use crate::Result;
use compute::gpu::context::VulkanContext;
use crevice::std140::{AsStd140, UVec2, Vec2};
use data::{
    coefficients::{CoefficientName, Coefficients},
    edge::EdgeMode,
};
use vulkano::{
    buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    memory::allocator::{AllocationCreateInfo, MemoryTypeFilter},
};

/// Contents of the kernel's `Parameters` uniform block
///
/// Every coefficient is passed as its (min, max) value range, whatever its
/// mask, so that range changes never affect the kernel.
#[derive(AsStd140)]
pub struct Parameters {
    /// Field shape as (width, height)
    pub shape: UVec2,

    /// Edge handling, as an [`EdgeMode`] code
    pub edge_mode: u32,

    /// Value ranges, in [`CoefficientName::ALL`] order
    pub diffusion_rate_a: Vec2,
    pub diffusion_rate_b: Vec2,
    pub feed_rate: Vec2,
    pub kill_rate: Vec2,
    pub time_delta: Vec2,
}
//
impl Parameters {
    /// Parameters for stepping a field of shape [rows, cols]
    pub fn new(coefficients: &Coefficients, [rows, cols]: [usize; 2], edge_mode: EdgeMode) -> Self {
        let range = |name: CoefficientName| {
            let coefficient = coefficients[name];
            Vec2 {
                x: coefficient.min,
                y: coefficient.max,
            }
        };
        Self {
            shape: UVec2 {
                x: u32::try_from(cols).expect("Field width was checked at allocation time"),
                y: u32::try_from(rows).expect("Field height was checked at allocation time"),
            },
            edge_mode: edge_mode.code(),
            diffusion_rate_a: range(CoefficientName::DiffusionRateA),
            diffusion_rate_b: range(CoefficientName::DiffusionRateB),
            feed_rate: range(CoefficientName::FeedRate),
            kill_rate: range(CoefficientName::KillRate),
            time_delta: range(CoefficientName::TimeDelta),
        }
    }
}

/// GPU-readable version of the parameters
pub type GpuParameters = <Parameters as AsStd140>::Output;

/// Allocate GPU-accessible storage for the parameters
pub fn expose(context: &VulkanContext, parameters: &Parameters) -> Result<Subbuffer<GpuParameters>> {
    Ok(Buffer::from_data(
        context.memory_allocator.clone(),
        BufferCreateInfo {
            usage: BufferUsage::UNIFORM_BUFFER,
            ..Default::default()
        },
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        },
        parameters.as_std140(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::mask::Mask;

    /// Read the `f32` at some byte offset of the GPU parameters
    fn float_at(gpu: &GpuParameters, offset: usize) -> f32 {
        let bytes = bytemuck::bytes_of(gpu);
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    /// Read the `u32` at some byte offset of the GPU parameters
    fn uint_at(gpu: &GpuParameters, offset: usize) -> u32 {
        let bytes = bytemuck::bytes_of(gpu);
        u32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn std140_layout() {
        let mut coefficients = Coefficients::default();
        coefficients.set_mask(CoefficientName::FeedRate, Mask::SmoothCircle);
        coefficients.set_range(CoefficientName::FeedRate, 0.01, 0.09);
        let gpu = Parameters::new(&coefficients, [32, 64], EdgeMode::Mirror).as_std140();

        // uvec2 shape, then uint edge_mode, then vec2s aligned to 8 bytes
        assert_eq!(uint_at(&gpu, 0), 64);
        assert_eq!(uint_at(&gpu, 4), 32);
        assert_eq!(uint_at(&gpu, 8), EdgeMode::Mirror.code());
        let ranges = [16, 24, 32, 40, 48].map(|offset| [float_at(&gpu, offset), float_at(&gpu, offset + 4)]);
        let expected = CoefficientName::ALL.map(|name| [coefficients[name].min, coefficients[name].max]);
        assert_eq!(ranges, expected);
        assert_eq!(ranges[2], [0.01, 0.09]);
    }

    #[test]
    fn ranges_follow_coefficients() {
        let mut coefficients = Coefficients::default();
        coefficients.set_range(CoefficientName::KillRate, 0.05, 0.07);
        let params = Parameters::new(&coefficients, [8, 4], EdgeMode::Repeat);
        assert_eq!((params.shape.x, params.shape.y), (4, 8));
        assert_eq!(params.edge_mode, EdgeMode::Repeat.code());
        assert_eq!((params.kill_rate.x, params.kill_rate.y), (0.05, 0.07));
        assert_eq!(params.time_delta.y, coefficients[CoefficientName::TimeDelta].max);
    }
}
