//! Double-buffered storage of the simulation field

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;

use crate::{array2, cell::Cell};
use ndarray::{s, ArrayView2, ArrayViewMut2};
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage for one W×H grid of cells
///
/// Shapes are expressed as [rows, cols], i.e. [height, width], like ndarray.
///
/// Implementations may keep their data in memory that is not directly
/// accessible by the CPU, in which case host access goes through the `read` and
/// `modify` scoped accessors. The view that these accessors provide must not
/// escape the callback.
pub trait Field: Sized {
    /// Implementation-specific context needed to allocate storage
    type Context;

    /// Error that can occur while allocating or accessing storage
    type Error: std::error::Error + Send + Sync + 'static;

    /// Allocate a field of a certain shape, filled with the neutral state
    fn neutral(context: &mut Self::Context, shape: [usize; 2]) -> Result<Self, Self::Error>;

    /// Shape that was passed to the constructor
    fn shape(&self) -> [usize; 2];

    /// Read the field contents from the CPU
    fn read<R>(&self, reader: impl FnOnce(ArrayView2<'_, Cell>) -> R) -> Result<R, Self::Error>;

    /// Modify the field contents from the CPU
    fn modify<R>(
        &mut self,
        writer: impl FnOnce(ArrayViewMut2<'_, Cell>) -> R,
    ) -> Result<R, Self::Error>;

    /// Set every cell of the field to the same state
    fn fill(&mut self, cell: Cell) -> Result<(), Self::Error> {
        self.modify(|mut view| view.fill(cell))
    }
}

/// Pair of fields used in ping-pong fashion by the simulation
///
/// At any point in time, one of the fields is the current simulation state and
/// the other is the target of the next simulation step. Which is which is
/// tracked by a selector, which `swap()` toggles without moving any data.
pub struct FieldPair<F: Field> {
    /// Field storage
    slots: [F; 2],

    /// Truth that the second slot holds the current state
    flipped: bool,

    /// Identifier of the current storage allocation
    generation: u64,

    /// Context used to allocate storage
    context: F::Context,
}
//
impl<F: Field> FieldPair<F> {
    /// Allocate a pair of fields in the neutral state
    pub fn new(mut context: F::Context, shape: [usize; 2]) -> Result<Self, F::Error> {
        let slots = [
            F::neutral(&mut context, shape)?,
            F::neutral(&mut context, shape)?,
        ];
        Ok(Self {
            slots,
            flipped: false,
            generation: next_generation(),
            context,
        })
    }

    /// Shape of the fields, as [rows, cols]
    pub fn shape(&self) -> [usize; 2] {
        self.slots[0].shape()
    }

    /// Index of the slot that holds the current state
    pub fn current_index(&self) -> usize {
        self.flipped as usize
    }

    /// Access both storage slots, for backends which bind them once and then
    /// select them using `current_index()`
    pub fn slots(&self) -> &[F; 2] {
        &self.slots
    }

    /// Identifier of the current storage allocation
    ///
    /// It changes whenever the underlying storage is replaced, which tells
    /// backends that any resource that refers to the old storage is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current simulation state
    pub fn current(&self) -> &F {
        &self.slots[self.current_index()]
    }

    /// Mutable access to the current simulation state
    pub fn current_mut(&mut self) -> &mut F {
        let current = self.current_index();
        &mut self.slots[current]
    }

    /// Access the current state as an input and the other field as an output
    pub fn in_out(&mut self) -> (&F, &mut F) {
        let [first, second] = &mut self.slots;
        if self.flipped {
            (second, first)
        } else {
            (first, second)
        }
    }

    /// Exchange the roles of the two fields
    pub fn swap(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Read the current state from the CPU
    pub fn read_current<R>(
        &self,
        reader: impl FnOnce(ArrayView2<'_, Cell>) -> R,
    ) -> Result<R, F::Error> {
        self.current().read(reader)
    }

    /// Modify the current state from the CPU
    pub fn modify_current<R>(
        &mut self,
        writer: impl FnOnce(ArrayViewMut2<'_, Cell>) -> R,
    ) -> Result<R, F::Error> {
        self.current_mut().modify(writer)
    }

    /// Reset both fields to the neutral state
    pub fn clear(&mut self) -> Result<(), F::Error> {
        for slot in &mut self.slots {
            slot.fill(Cell::NEUTRAL)?;
        }
        Ok(())
    }

    /// Change the field shape, keeping the contents of the region that the old
    /// and new shapes have in common
    ///
    /// Both fields are anchored at their top-left corner. Cells that are
    /// outside of the old shape start in the neutral state. The old storage is
    /// only replaced once the new storage has been fully initialized, so
    /// failure leaves the pair untouched.
    pub fn resize(&mut self, shape: [usize; 2]) -> Result<(), F::Error> {
        let old_shape = self.shape();
        if shape == old_shape {
            return Ok(());
        }
        let overlap = array2(|i| old_shape[i].min(shape[i]));
        let slots = [
            Self::resized(&self.slots[0], &mut self.context, shape, overlap)?,
            Self::resized(&self.slots[1], &mut self.context, shape, overlap)?,
        ];
        self.slots = slots;
        self.generation = next_generation();
        log::debug!("Resized field pair from {old_shape:?} to {shape:?}");
        Ok(())
    }

    /// Copy of a field with a different shape, see `resize()`
    fn resized(
        old: &F,
        context: &mut F::Context,
        shape: [usize; 2],
        [rows, cols]: [usize; 2],
    ) -> Result<F, F::Error> {
        let mut new = F::neutral(context, shape)?;
        old.read(|source| {
            new.modify(|mut target| {
                target
                    .slice_mut(s![..rows, ..cols])
                    .assign(&source.slice(s![..rows, ..cols]));
            })
        })??;
        Ok(new)
    }
}

/// Generate a fresh field storage identifier
fn next_generation() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::{cpu::CpuField, *};

    fn pattern(row: usize, col: usize) -> Cell {
        Cell::new(
            (row as f32) / 8.0,
            (col as f32) / 8.0,
            (row * 4 + col) as f32,
        )
    }

    fn patterned(shape: [usize; 2]) -> FieldPair<CpuField> {
        let mut pair = FieldPair::<CpuField>::new((), shape).unwrap();
        pair.modify_current(|mut view| {
            for ((row, col), cell) in view.indexed_iter_mut() {
                *cell = pattern(row, col);
            }
        })
        .unwrap();
        pair
    }

    #[test]
    fn new_pair_is_neutral() {
        let pair = FieldPair::<CpuField>::new((), [3, 5]).unwrap();
        assert_eq!(pair.shape(), [3, 5]);
        for slot in pair.slots() {
            assert_eq!(Field::shape(slot), [3, 5]);
            assert!(slot.iter().all(|cell| *cell == Cell::NEUTRAL));
        }
    }

    #[test]
    fn swap_is_an_involution() {
        let mut pair = patterned([4, 4]);
        let initial_index = pair.current_index();
        let initial_current = pair.current().clone();
        pair.swap();
        assert_ne!(pair.current_index(), initial_index);
        assert_ne!(pair.current(), &initial_current);
        pair.swap();
        assert_eq!(pair.current_index(), initial_index);
        assert_eq!(pair.current(), &initial_current);
    }

    #[test]
    fn in_out_follows_selector() {
        let mut pair = patterned([4, 4]);
        let (input, output) = pair.in_out();
        assert_eq!(input[[1, 2]], pattern(1, 2));
        output[[0, 0]] = Cell::new(0.0, 1.0, 0.0);
        pair.swap();
        assert_eq!(pair.current()[[0, 0]], Cell::new(0.0, 1.0, 0.0));
        let (input, _output) = pair.in_out();
        assert_eq!(input[[0, 0]], Cell::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn clear_resets_both_fields() {
        let mut pair = patterned([4, 4]);
        pair.swap();
        pair.modify_current(|mut view| view.fill(Cell::new(0.5, 0.5, 0.5)))
            .unwrap();
        pair.clear().unwrap();
        for slot in pair.slots() {
            assert!(slot.iter().all(|cell| *cell == Cell::NEUTRAL));
        }
    }

    #[test]
    fn resize_round_trip_preserves_overlap() {
        let mut pair = patterned([4, 4]);
        let original = pair.current().clone();
        let generation = pair.generation();

        pair.resize([8, 8]).unwrap();
        assert_eq!(pair.shape(), [8, 8]);
        assert_ne!(pair.generation(), generation);
        pair.read_current(|view| {
            assert_eq!(view.slice(s![..4, ..4]), original);
            assert!(view.slice(s![4.., ..]).iter().all(|c| *c == Cell::NEUTRAL));
            assert!(view.slice(s![.., 4..]).iter().all(|c| *c == Cell::NEUTRAL));
        })
        .unwrap();

        pair.resize([4, 4]).unwrap();
        assert_eq!(pair.current(), &original);
    }

    #[test]
    fn resize_keeps_both_roles() {
        let mut pair = patterned([4, 4]);
        pair.swap();
        pair.modify_current(|mut view| view.fill(Cell::new(0.0, 1.0, 0.0)))
            .unwrap();
        let index = pair.current_index();
        pair.resize([2, 6]).unwrap();
        assert_eq!(pair.current_index(), index);
        assert_eq!(pair.current()[[1, 1]], Cell::new(0.0, 1.0, 0.0));
        assert_eq!(pair.current()[[1, 5]], Cell::NEUTRAL);
        pair.swap();
        assert_eq!(pair.current()[[1, 3]], pattern(1, 3));
    }
}
