//! Data model of the masked Gray-Scott reaction-diffusion engine
//!
//! This crate holds everything that compute backends and front-ends need to
//! agree on: the per-cell state, the simulation coefficients and their spatial
//! masks, the boundary handling, the double-buffered field storage, and the
//! geometry of user brush strokes.

pub mod cell;
pub mod coefficients;
pub mod edge;
pub mod field;
pub mod mask;
pub mod stroke;

/// Computation precision
pub type Precision = f32;

/// Number of bits used to store each component of a cell
pub const PRECISION_BITS: usize = 8 * std::mem::size_of::<Precision>();

/// Build a two-element array from its index, e.g. for shapes and positions
pub fn array2<T>(f: impl FnMut(usize) -> T) -> [T; 2] {
    std::array::from_fn(f)
}
