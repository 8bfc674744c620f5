//! Benchmarking utilities
//!
//! Please consider using the [`criterion_benchmark!`](crate::criterion_benchmark)
//! macro instead of calling these implementation details directly.

use crate::{Simulate, SimulateCreate};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{
    coefficients::{CoefficientName, Coefficients},
    edge::EdgeMode,
    mask::Mask,
};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<$backend::Simulation>(
                c,
                stringify!($backend),
            )
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all compute backends
///
/// Measures batches of simulation steps over a range of field sizes, with
/// uniform coefficients and with a mask on every coefficient.
pub fn criterion_benchmark<Simulation: SimulateCreate + Simulate>(
    c: &mut Criterion,
    backend_name: &str,
) {
    init_logger();

    let args = Simulation::CliArgs::from_arg_matches(
        &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    let uniform = Coefficients::default();
    let mut masked = uniform;
    for (name, mask) in CoefficientName::ALL
        .into_iter()
        .zip(Mask::palette().into_iter().skip(1))
    {
        masked.set_mask(name, mask);
    }

    let mut sim = Simulation::new(black_box(&uniform), black_box(args))
        .expect("Failed to set up the simulation");
    let mut group = c.benchmark_group(backend_name.to_owned());
    for (coefficients_name, coefficients) in [("uniform", uniform), ("masked", masked)] {
        sim.update_coefficients(&coefficients)
            .expect("Failed to update coefficients");
        for num_steps_pow2 in [0, 4, 8] {
            let num_steps = 2usize.pow(num_steps_pow2);
            for size_pow2 in 5..=10 {
                let size = 2usize.pow(size_pow2);
                let shape = [size, 2 * size];
                let num_elems = (shape[0] * shape[1]) as u64;

                let mut field = sim
                    .make_field_pair(black_box(shape))
                    .expect("Failed to allocate the field");

                group.throughput(Throughput::Elements(num_elems * num_steps as u64));
                group.bench_function(
                    BenchmarkId::from_parameter(format!(
                        "{coefficients_name},{}x{}elems,{num_steps}steps",
                        shape[1], shape[0]
                    )),
                    |b| {
                        b.iter(|| {
                            sim.perform_steps(&mut field, EdgeMode::Repeat, num_steps)
                                .expect("Failed to simulate")
                        });
                    },
                );
                black_box(field);
            }
        }
    }
    group.finish();
}
