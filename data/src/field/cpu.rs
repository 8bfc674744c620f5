//! Field storage in CPU memory

use super::Field;
use crate::cell::Cell;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use std::convert::Infallible;

/// Straightforward field implementation based on an ndarray of cells
pub type CpuField = Array2<Cell>;
//
impl Field for CpuField {
    type Context = ();
    type Error = Infallible;

    fn neutral(_context: &mut (), shape: [usize; 2]) -> Result<Self, Infallible> {
        Ok(Array2::from_elem(shape, Cell::NEUTRAL))
    }

    fn shape(&self) -> [usize; 2] {
        let (rows, cols) = self.dim();
        [rows, cols]
    }

    fn read<R>(&self, reader: impl FnOnce(ArrayView2<'_, Cell>) -> R) -> Result<R, Infallible> {
        Ok(reader(self.view()))
    }

    fn modify<R>(
        &mut self,
        writer: impl FnOnce(ArrayViewMut2<'_, Cell>) -> R,
    ) -> Result<R, Infallible> {
        Ok(writer(self.view_mut()))
    }
}
