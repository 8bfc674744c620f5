//! Command-line arguments

use clap::Args;
use compute::SimulateBase;
use data::{
    coefficients::{CoefficientName, Coefficients},
    edge::EdgeMode,
    mask::Mask,
    Precision,
};
use engine::{ColorMode, EngineConfig};

/// CLI arguments shared by the programs that drive the engine
#[derive(Args)]
pub struct SharedArgs<Simulation: SimulateBase> {
    /// Width of the simulation field, in cells
    #[arg(short = 'W', long, default_value_t = 512)]
    pub width: usize,

    /// Height of the simulation field, in cells
    #[arg(short = 'H', long, default_value_t = 512)]
    pub height: usize,

    /// Number of random dots that the field is initially seeded with
    #[arg(long, default_value_t = 200)]
    pub dots: usize,

    /// Seed of the random dot placement
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Handling of the field edges (repeat or mirror)
    #[arg(short, long, default_value_t = EdgeMode::Repeat)]
    pub wrap: EdgeMode,

    /// Color mapping of the output (grayscale, inferno, viridis, magma,
    /// turbo or change)
    #[arg(long, default_value_t = ColorMode::Grayscale)]
    pub color: ColorMode,

    /// Value range of a coefficient, as NAME=VALUE or NAME=MIN,MAX
    ///
    /// Coefficients are diffusionRateA, diffusionRateB, feedRate, killRate
    /// and timeDelta. Can be repeated.
    #[arg(short, long = "range", value_parser = parse_range)]
    pub ranges: Vec<(CoefficientName, Precision, Precision)>,

    /// Mask of a coefficient, as NAME=MASK
    ///
    /// Masks are solid, gradient:DEGREES, hard-circle and smooth-circle. Can
    /// be repeated.
    #[arg(short, long = "mask", value_parser = parse_mask)]
    pub masks: Vec<(CoefficientName, Mask)>,

    /// Backend-specific CLI arguments
    #[command(flatten)]
    pub backend: Simulation::CliArgs,
}
//
impl<Simulation: SimulateBase> SharedArgs<Simulation> {
    /// Coefficients resulting from the defaults and command-line overrides
    pub fn coefficients(&self) -> Coefficients {
        let mut coefficients = Coefficients::default();
        for &(name, min, max) in &self.ranges {
            coefficients.set_range(name, min, max);
        }
        for &(name, mask) in &self.masks {
            coefficients.set_mask(name, mask);
        }
        coefficients
    }

    /// Engine configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            size: [self.width, self.height],
            initial_dots: self.dots,
            seed: self.seed,
            coefficients: self.coefficients(),
            edge_mode: self.wrap,
            color_mode: self.color,
            ..EngineConfig::default()
        }
    }
}

/// Split a NAME=VALUE argument
fn split_assignment(s: &str) -> Result<(CoefficientName, &str), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let name = name.trim().parse().map_err(|e| format!("{e}"))?;
    Ok((name, value.trim()))
}

/// Parse a coefficient range argument
pub fn parse_range(s: &str) -> Result<(CoefficientName, Precision, Precision), String> {
    let (name, range) = split_assignment(s)?;
    let parse = |x: &str| {
        x.trim()
            .parse::<Precision>()
            .map_err(|e| format!("bad value {x:?}: {e}"))
    };
    let (min, max) = match range.split_once(',') {
        Some((min, max)) => (parse(min)?, parse(max)?),
        None => {
            let value = parse(range)?;
            (value, value)
        }
    };
    Ok((name, min, max))
}

/// Parse a coefficient mask argument
pub fn parse_mask(s: &str) -> Result<(CoefficientName, Mask), String> {
    let (name, mask) = split_assignment(s)?;
    Ok((name, mask.parse().map_err(|e| format!("{e}"))?))
}
