//! State of one simulation cell

use crate::Precision;
use bytemuck::{Pod, Zeroable};

/// State of a single cell of the simulation field
///
/// The memory layout matches a GLSL `vec4`, so a slice of cells can be
/// uploaded to a GPU storage buffer as-is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Cell {
    /// Concentration of chemical A, in [0, 1]
    pub a: Precision,

    /// Concentration of chemical B, in [0, 1]
    pub b: Precision,

    /// Decaying record of recent variation, used for visualization only
    pub change: Precision,

    /// Unused fourth component
    pub padding: Precision,
}
//
impl Cell {
    /// Neutral state that the field starts from and is cleared to
    pub const NEUTRAL: Self = Self::new(1.0, 0.0, 0.0);

    /// Build a cell from its meaningful components
    pub const fn new(a: Precision, b: Precision, change: Precision) -> Self {
        Self {
            a,
            b,
            change,
            padding: 0.0,
        }
    }

    /// Truth that both concentrations are within their allowed range
    pub fn is_bounded(&self) -> bool {
        (0.0..=1.0).contains(&self.a) && (0.0..=1.0).contains(&self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_vec4() {
        assert_eq!(std::mem::size_of::<Cell>(), 16);
        assert_eq!(std::mem::align_of::<Cell>(), 4);
        let words: [Precision; 4] = bytemuck::cast(Cell::new(0.25, 0.5, 0.75));
        assert_eq!(words, [0.25, 0.5, 0.75, 0.0]);
    }

    #[test]
    fn neutral_state() {
        assert_eq!(Cell::NEUTRAL, Cell::new(1.0, 0.0, 0.0));
        assert!(Cell::NEUTRAL.is_bounded());
        assert!(!Cell::new(1.5, 0.0, 0.0).is_bounded());
    }
}
