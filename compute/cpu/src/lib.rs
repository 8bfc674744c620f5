//! Multi-core CPU implementation of the masked Gray-Scott simulation
//!
//! This backend evaluates the same per-cell update as the GPU kernel, one
//! output row at a time across all CPU cores. It needs no device, which makes
//! it the reference implementation and the fallback on machines without a
//! usable GPU.

use clap::Args;
use compute::{
    kernel::{KernelCache, KernelId},
    Simulate, SimulateBase, SimulateCreate,
};
use data::{
    cell::Cell,
    coefficients::{Coefficients, MaskLayout, Values, CHANGE_RETENTION, STENCIL},
    edge::EdgeMode,
    field::{cpu::CpuField, FieldPair},
    mask::{mix, Position},
    Precision,
};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use ndarray::{ArrayView2, ArrayViewMut2, Zip};
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use std::{convert::Infallible, num::NonZeroUsize};
use thiserror::Error;

/// Largest number of rows or columns that this backend accepts
pub const MAX_FIELD_SIZE: usize = 16384;

/// Parameters are tunable via CLI args and environment variables
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CliArgs {
    /// Number of processing threads
    #[arg(short = 'j', long, env)]
    num_threads: Option<NonZeroUsize>,
}

/// Masked Gray-Scott reaction simulation on the CPU
pub struct Simulation {
    /// Kernel specialized for the current coefficient masks
    kernels: KernelCache<Kernel>,

    /// Latest coefficients, whose value ranges the kernel reads
    coefficients: Coefficients,
}
//
impl SimulateBase for Simulation {
    type CliArgs = CliArgs;

    type Field = CpuField;

    type Error = Error;

    fn make_field_pair(&self, shape: [usize; 2]) -> Result<FieldPair<CpuField>> {
        if shape.iter().any(|&len| len == 0 || len > MAX_FIELD_SIZE) {
            return Err(Error::UnsupportedShape(shape));
        }
        Ok(FieldPair::new((), shape)?)
    }

    fn max_field_size(&self) -> usize {
        MAX_FIELD_SIZE
    }
}
//
impl SimulateCreate for Simulation {
    fn new(coefficients: &Coefficients, args: CliArgs) -> Result<Self> {
        if let Some(num_threads) = args.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads.into())
                .build_global()?;
        }
        Ok(Self {
            kernels: KernelCache::new(coefficients, Kernel::compile)?,
            coefficients: *coefficients,
        })
    }
}
//
impl Simulate for Simulation {
    fn update_coefficients(&mut self, coefficients: &Coefficients) -> Result<()> {
        self.kernels.update(coefficients, Kernel::compile)?;
        self.coefficients = *coefficients;
        Ok(())
    }

    fn kernel_id(&self) -> KernelId {
        self.kernels.id()
    }

    fn perform_steps(
        &mut self,
        field: &mut FieldPair<CpuField>,
        edge_mode: EdgeMode,
        steps: usize,
    ) -> Result<()> {
        let (_, kernel) = self.kernels.get();
        for _ in 0..steps {
            let (input, output) = field.in_out();
            kernel.step(&self.coefficients, edge_mode, input.view(), output.view_mut());
            field.swap();
        }
        Ok(())
    }
}

/// CPU counterpart of a compiled kernel
///
/// Holds the mask that each coefficient is evaluated with, while the value
/// ranges are read from the latest coefficients at every step.
#[derive(Debug)]
struct Kernel {
    masks: MaskLayout,
}
//
impl Kernel {
    /// Specialize for the masks of some coefficients
    fn compile(coefficients: &Coefficients) -> std::result::Result<Self, Infallible> {
        Ok(Self {
            masks: coefficients.masks(),
        })
    }

    /// Coefficient values at some position
    #[inline]
    fn values_at(&self, coefficients: &Coefficients, position: Position) -> Values {
        let mut values = [0.0; 5];
        for ((value, mask), (_name, coefficient)) in
            values.iter_mut().zip(&self.masks).zip(coefficients.iter())
        {
            *value = mix(coefficient.min, coefficient.max, mask.factor(position));
        }
        let [diffusion_rate_a, diffusion_rate_b, feed_rate, kill_rate, time_delta] = values;
        Values {
            diffusion_rate_a,
            diffusion_rate_b,
            feed_rate,
            kill_rate,
            time_delta,
        }
    }

    /// Perform one simulation step from `input` into `output`
    fn step(
        &self,
        coefficients: &Coefficients,
        edge_mode: EdgeMode,
        input: ArrayView2<'_, Cell>,
        output: ArrayViewMut2<'_, Cell>,
    ) {
        debug_assert_eq!(input.dim(), output.dim());
        let (rows, cols) = input.dim();
        Zip::indexed(output).par_for_each(|(row, col), out| {
            let position = [
                (col as Precision + 0.5) / cols as Precision,
                (row as Precision + 0.5) / rows as Precision,
            ];
            let mut laplacian = [0.0; 2];
            for (weights, drow) in STENCIL.iter().zip(-1isize..=1) {
                let in_row = edge_mode.resolve(row as isize + drow, rows);
                for (&weight, dcol) in weights.iter().zip(-1isize..=1) {
                    let in_col = edge_mode.resolve(col as isize + dcol, cols);
                    let neighbor = input[[in_row, in_col]];
                    laplacian[0] += weight * neighbor.a;
                    laplacian[1] += weight * neighbor.b;
                }
            }
            let values = self.values_at(coefficients, position);
            *out = update_cell(input[[row, col]], laplacian, &values);
        });
    }
}

/// Gray-Scott update of a single cell, given the discrete Laplacian of its
/// (a, b) concentrations and the local coefficient values
///
/// Concentrations are clamped to [0, 1]. The change signal keeps the latest
/// variation or a slowly decaying memory of past variations, whichever is
/// larger.
#[inline]
pub fn update_cell(cell: Cell, [laplacian_a, laplacian_b]: [Precision; 2], values: &Values) -> Cell {
    let Cell {
        a,
        b,
        change: old_change,
        ..
    } = cell;
    let reaction = a * b * b;
    let da = values.diffusion_rate_a * laplacian_a - reaction + values.feed_rate * (1.0 - a);
    let db = values.diffusion_rate_b * laplacian_b + reaction
        - (values.kill_rate + values.feed_rate) * b;
    let new_a = (a + da * values.time_delta).clamp(0.0, 1.0);
    let new_b = (b + db * values.time_delta).clamp(0.0, 1.0);
    let change = (a - new_a) - (b - new_b);
    let new_change = change.max(mix(change, old_change, CHANGE_RETENTION));
    Cell::new(new_a, new_b, new_change)
}

/// Things that can go wrong when performing CPU simulation
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to configure thread pool
    #[error("failed to configure thread pool")]
    ThreadPool(#[from] ThreadPoolBuildError),

    /// Cannot happen, CPU fields and kernels are infallible
    #[doc(hidden)]
    #[error(transparent)]
    Infallible(#[from] Infallible),

    /// Field shape is empty or too large
    #[error("field shape {0:?} is not supported")]
    UnsupportedShape([usize; 2]),
}
//
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use data::{
        coefficients::CoefficientName,
        field::Field,
        mask::Mask,
        stroke::{self, Stroke},
    };
    use rand::prelude::*;

    fn simulation(coefficients: &Coefficients) -> Simulation {
        Simulation::new(coefficients, CliArgs::default()).unwrap()
    }

    #[test]
    fn update_stays_bounded() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let cell = Cell::new(rng.gen(), rng.gen(), rng.gen_range(-1.0..1.0));
            let laplacian = [rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)];
            let values = Values {
                diffusion_rate_a: rng.gen_range(0.0..=1.0),
                diffusion_rate_b: rng.gen_range(0.0..=1.0),
                feed_rate: rng.gen_range(0.0..=0.1),
                kill_rate: rng.gen_range(0.0..=0.1),
                time_delta: rng.gen_range(0.0..=1.0),
            };
            let new = update_cell(cell, laplacian, &values);
            assert!(new.is_bounded(), "{cell:?} + {values:?} gave {new:?}");
        }
    }

    #[test]
    fn neutral_field_is_stationary() {
        let mut sim = simulation(&Coefficients::default());
        let mut field = sim.make_field_pair([16, 16]).unwrap();
        sim.perform_steps(&mut field, EdgeMode::Repeat, 10).unwrap();
        assert!(field.current().iter().all(|cell| *cell == Cell::NEUTRAL));
    }

    #[test]
    fn change_signal_decays() {
        let values = Coefficients::default().values_at([0.5, 0.5]);
        let spiked = Cell::new(1.0, 0.0, 0.5);
        let next = update_cell(spiked, [0.0, 0.0], &values);
        assert!((next.change - 0.495).abs() < 1e-6);
    }

    #[test]
    fn deposit_spreads_with_both_edge_modes() {
        for edge_mode in [EdgeMode::Repeat, EdgeMode::Mirror] {
            let mut sim = simulation(&Coefficients::default());
            let mut field = sim.make_field_pair([32, 32]).unwrap();
            field
                .modify_current(|view| stroke::draw(view, &Stroke::dot([1.0, 1.0]), edge_mode))
                .unwrap();
            sim.perform_steps(&mut field, edge_mode, 20).unwrap();
            let current = field.current();
            assert!(current.iter().all(Cell::is_bounded));
            assert!(current.iter().map(|cell| cell.b).sum::<f32>() > 0.0);
        }
    }

    #[test]
    fn mirror_mode_is_symmetric() {
        let mut sim = simulation(&Coefficients::default());
        let mut field = sim.make_field_pair([16, 16]).unwrap();
        field
            .modify_current(|mut view| {
                view.row_mut(0).fill(Cell::new(0.0, 1.0, 0.0));
            })
            .unwrap();
        sim.perform_steps(&mut field, EdgeMode::Mirror, 5).unwrap();
        let current = field.current();
        for row in 0..16 {
            let first = current[[row, 0]];
            assert!(current.row(row).iter().all(|cell| *cell == first));
        }
    }

    #[test]
    fn masks_make_coefficients_vary() {
        let mut coefficients = Coefficients::default();
        coefficients.set_range(CoefficientName::DiffusionRateB, 0.0, 0.5);
        coefficients.set_mask(CoefficientName::DiffusionRateB, Mask::HardCircle);
        let sim = simulation(&coefficients);
        let (_, kernel) = sim.kernels.get();
        let center = kernel.values_at(&coefficients, [0.5, 0.5]);
        let corner = kernel.values_at(&coefficients, [0.0, 0.0]);
        assert_eq!(center.diffusion_rate_b, 0.0);
        assert_eq!(corner.diffusion_rate_b, 0.5);
        assert_eq!(center.feed_rate, corner.feed_rate);
    }

    #[test]
    fn kernel_follows_masks() {
        let mut coefficients = Coefficients::default();
        let mut sim = simulation(&coefficients);
        let initial = sim.kernel_id();

        coefficients.set_range(CoefficientName::FeedRate, 0.03, 0.06);
        sim.update_coefficients(&coefficients).unwrap();
        assert_eq!(sim.kernel_id(), initial);

        coefficients.set_mask(CoefficientName::FeedRate, Mask::SmoothCircle);
        sim.update_coefficients(&coefficients).unwrap();
        assert_ne!(sim.kernel_id(), initial);

        let field = sim.make_field_pair([4, 8]).unwrap();
        assert_eq!(Field::shape(field.current()), [4, 8]);
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        let sim = simulation(&Coefficients::default());
        for shape in [[0, 16], [16, 0], [MAX_FIELD_SIZE + 1, 1]] {
            assert!(matches!(
                sim.make_field_pair(shape),
                Err(Error::UnsupportedShape(s)) if s == shape
            ));
        }
        assert!(sim.make_field_pair([1, MAX_FIELD_SIZE]).is_ok());
    }
}
