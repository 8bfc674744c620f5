//! Engine configuration

use crate::compositor::ColorMode;
use data::{coefficients::Coefficients, edge::EdgeMode};

/// Initial state of an [`Engine`](crate::Engine)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Field size as [width, height]
    pub size: [usize; 2],

    /// Number of random dots that the field is seeded with
    pub initial_dots: usize,

    /// Seed of the random number generator that places initial dots
    pub seed: u64,

    /// Initial simulation coefficients
    pub coefficients: Coefficients,

    /// Handling of the field edges
    pub edge_mode: EdgeMode,

    /// Color mapping of the result
    pub color_mode: ColorMode,

    /// Truth that a frame should be drawn around the field in views
    pub frame_visible: bool,
}
//
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            size: [256, 256],
            initial_dots: 200,
            seed: 42,
            coefficients: Coefficients::default(),
            edge_mode: EdgeMode::default(),
            color_mode: ColorMode::default(),
            frame_visible: true,
        }
    }
}
