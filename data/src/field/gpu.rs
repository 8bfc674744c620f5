//! Field storage in GPU-accessible memory

use super::Field;
use crate::cell::Cell;
use ndarray::{ArrayView2, ArrayViewMut2};
use std::sync::Arc;
use thiserror::Error;
use vulkano::{
    buffer::{AllocateBufferError, Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter},
    sync::HostAccessError,
    DeviceSize, Validated,
};

/// Context needed to allocate buffer-based fields
#[derive(Clone)]
pub struct BufferContext {
    /// Allocator for device memory
    memory_allocator: Arc<dyn MemoryAllocator>,
}
//
impl BufferContext {
    /// Allocate fields using a certain memory allocator
    pub fn new(memory_allocator: Arc<dyn MemoryAllocator>) -> Self {
        Self { memory_allocator }
    }
}

/// Field stored as a row-major storage buffer of cells
///
/// The buffer lives in memory that is both device-local (when possible) and
/// host-visible, so that brush strokes and readback do not need staging
/// copies. Each cell is laid out as a `vec4` that shaders can index as
/// `row * width + col`.
pub struct BufferField {
    /// Cell storage
    buffer: Subbuffer<[Cell]>,

    /// Field dimensions as [rows, cols]
    shape: [usize; 2],
}
//
impl BufferField {
    /// Access the underlying buffer for GPU work
    ///
    /// The buffer must not be accessed by the host while GPU work that uses it
    /// is in flight, and vice versa.
    pub fn buffer(&self) -> &Subbuffer<[Cell]> {
        &self.buffer
    }

    /// Buffer usage needed by compute kernels
    pub fn buffer_usage() -> BufferUsage {
        BufferUsage::STORAGE_BUFFER
    }

    /// Size of a field of a certain shape, in bytes
    pub fn byte_size(shape: [usize; 2]) -> Option<DeviceSize> {
        let len = shape[0].checked_mul(shape[1])?;
        let bytes = len.checked_mul(std::mem::size_of::<Cell>())?;
        DeviceSize::try_from(bytes).ok()
    }
}
//
impl Field for BufferField {
    type Context = BufferContext;
    type Error = Error;

    fn neutral(context: &mut BufferContext, shape: [usize; 2]) -> Result<Self> {
        let len = shape[0]
            .checked_mul(shape[1])
            .filter(|&len| len > 0 && Self::byte_size(shape).is_some())
            .ok_or(Error::BadShape(shape))?;
        let buffer = Buffer::from_iter(
            context.memory_allocator.clone(),
            BufferCreateInfo {
                usage: Self::buffer_usage(),
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_RANDOM_ACCESS,
                ..Default::default()
            },
            (0..len).map(|_| Cell::NEUTRAL),
        )?;
        Ok(Self { buffer, shape })
    }

    fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn read<R>(&self, reader: impl FnOnce(ArrayView2<'_, Cell>) -> R) -> Result<R> {
        let guard = self.buffer.read()?;
        let view = ArrayView2::from_shape(self.shape, &guard[..])
            .expect("The shape should be right (checked at construction time)");
        Ok(reader(view))
    }

    fn modify<R>(&mut self, writer: impl FnOnce(ArrayViewMut2<'_, Cell>) -> R) -> Result<R> {
        let mut guard = self.buffer.write()?;
        let view = ArrayViewMut2::from_shape(self.shape, &mut guard[..])
            .expect("The shape should be right (checked at construction time)");
        Ok(writer(view))
    }
}

/// Errors that can occur while using buffer-based fields
#[derive(Debug, Error)]
pub enum Error {
    #[error("field shape {0:?} is empty or too large to be allocated")]
    BadShape([usize; 2]),

    #[error("failed to allocate field buffer")]
    Allocation(#[from] Validated<AllocateBufferError>),

    #[error("failed to access field buffer from the host")]
    HostAccess(#[from] HostAccessError),
}
//
pub type Result<T, E = Error> = std::result::Result<T, E>;
