//! Common facilities shared by all compute backends

#[cfg(feature = "criterion")]
pub mod benchmark;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod kernel;

use self::kernel::KernelId;
use clap::Args;
use data::{
    coefficients::Coefficients,
    edge::EdgeMode,
    field::{Field, FieldPair},
};
use std::fmt::Debug;

/// Commonalities between all ways to set up a simulation
pub trait SimulateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args + Debug;

    /// Field storage used by this backend
    type Field: Field;

    /// Error type used by simulation operations
    type Error: std::error::Error
        + From<<Self::Field as Field>::Error>
        + Send
        + Sync
        + 'static;

    /// Allocate a pair of fields of a certain [rows, cols] shape, in the
    /// neutral state, which this backend can simulate
    fn make_field_pair(&self, shape: [usize; 2]) -> Result<FieldPair<Self::Field>, Self::Error>;

    /// Largest number of rows or columns that a field can have
    fn max_field_size(&self) -> usize;
}

/// Simulation compute backend interface expected by the engine
pub trait SimulateCreate: SimulateBase {
    /// Set up the simulation, compiling a kernel for a set of coefficients
    fn new(coefficients: &Coefficients, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Simulation operations
pub trait Simulate: SimulateBase {
    /// Take note of new simulation coefficients
    ///
    /// If the coefficient masks changed since the last kernel compilation, the
    /// kernel is regenerated and the previous one is released. Otherwise, only
    /// the coefficient values that the kernel reads are updated.
    fn update_coefficients(&mut self, coefficients: &Coefficients) -> Result<(), Self::Error>;

    /// Identity of the kernel that is currently used for simulation
    fn kernel_id(&self) -> KernelId;

    /// Perform `steps` simulation time steps on the current state of `field`
    ///
    /// At the end of the simulation, the current state of `field` will contain
    /// the final simulation results.
    fn perform_steps(
        &mut self,
        field: &mut FieldPair<Self::Field>,
        edge_mode: EdgeMode,
        steps: usize,
    ) -> Result<(), Self::Error>;
}

/// Placeholder for backends that take no CLI arguments
#[derive(Args, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NoArgs {}
