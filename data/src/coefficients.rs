//! Named simulation coefficients, each with a value range and a spatial mask

use crate::{
    mask::{Mask, Position},
    Precision,
};
use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};
use thiserror::Error;

/// Discrete Laplacian stencil weights
///
/// The central weight cancels out the sum of the neighbor weights, so that a
/// uniform field does not diffuse.
pub const STENCIL: Stencil = [[0.05, 0.2, 0.05], [0.2, -1.0, 0.2], [0.05, 0.2, 0.05]];

/// Computation stencil
pub type Stencil = [[Precision; 3]; 3];

/// Fraction of the previous change signal that is retained after each step
pub const CHANGE_RETENTION: Precision = 0.99;

/// Name of one of the Gray-Scott coefficients
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CoefficientName {
    DiffusionRateA,
    DiffusionRateB,
    FeedRate,
    KillRate,
    TimeDelta,
}
//
impl CoefficientName {
    /// All coefficient names, in storage order
    pub const ALL: [Self; 5] = [
        Self::DiffusionRateA,
        Self::DiffusionRateB,
        Self::FeedRate,
        Self::KillRate,
        Self::TimeDelta,
    ];

    /// Position of this coefficient in storage order
    pub const fn index(self) -> usize {
        self as usize
    }

    /// snake_case identifier, suitable for generated code
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::DiffusionRateA => "diffusion_rate_a",
            Self::DiffusionRateB => "diffusion_rate_b",
            Self::FeedRate => "feed_rate",
            Self::KillRate => "kill_rate",
            Self::TimeDelta => "time_delta",
        }
    }

    /// camelCase name, as used by interactive front-ends
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::DiffusionRateA => "diffusionRateA",
            Self::DiffusionRateB => "diffusionRateB",
            Self::FeedRate => "feedRate",
            Self::KillRate => "killRate",
            Self::TimeDelta => "timeDelta",
        }
    }
}
//
impl fmt::Display for CoefficientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
//
impl FromStr for CoefficientName {
    type Err = UnknownCoefficient;

    /// Accepts both the camelCase and snake_case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| s == name.identifier() || s == name.display_name())
            .ok_or_else(|| UnknownCoefficient(s.to_owned()))
    }
}

/// Attempted to refer to a coefficient that does not exist
#[derive(Clone, Debug, Error, PartialEq)]
#[error("unknown coefficient {0:?}, expected one of diffusionRateA, diffusionRateB, feedRate, killRate, timeDelta")]
pub struct UnknownCoefficient(pub String);

/// One simulation coefficient
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coefficient {
    /// Value where the mask evaluates to 0
    pub min: Precision,

    /// Value where the mask evaluates to 1
    pub max: Precision,

    /// Spatial distribution of the value
    pub mask: Mask,
}
//
impl Coefficient {
    /// Coefficient with the same value everywhere
    pub const fn uniform(value: Precision) -> Self {
        Self {
            min: value,
            max: value,
            mask: Mask::Solid,
        }
    }

    /// Value of the coefficient at some normalized position
    #[inline]
    pub fn value_at(&self, position: Position) -> Precision {
        self.mask.blend(self.min, self.max, position)
    }
}

/// Mask that is used by each coefficient, in storage order
///
/// Two coefficient sets with the same mask layout can be simulated by the same
/// compiled kernel, they only differ by kernel inputs.
pub type MaskLayout = [Mask; 5];

/// Full set of simulation coefficients
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coefficients([Coefficient; 5]);
//
impl Coefficients {
    /// Build from individual coefficients, in storage order
    pub const fn new(coefficients: [Coefficient; 5]) -> Self {
        Self(coefficients)
    }

    /// Iterate over named coefficients
    pub fn iter(&self) -> impl Iterator<Item = (CoefficientName, &Coefficient)> + '_ {
        CoefficientName::ALL.into_iter().zip(&self.0)
    }

    /// Replace the mask of one coefficient
    pub fn set_mask(&mut self, name: CoefficientName, mask: Mask) {
        self[name].mask = mask;
    }

    /// Replace the value range of one coefficient, leaving the mask alone
    pub fn set_range(&mut self, name: CoefficientName, min: Precision, max: Precision) {
        let coefficient = &mut self[name];
        coefficient.min = min;
        coefficient.max = max;
    }

    /// Masks of all coefficients, which determine the kernel's structure
    pub fn masks(&self) -> MaskLayout {
        self.0.map(|coefficient| coefficient.mask)
    }

    /// Evaluate all coefficients at some normalized position
    #[inline]
    pub fn values_at(&self, position: Position) -> Values {
        let [diffusion_rate_a, diffusion_rate_b, feed_rate, kill_rate, time_delta] =
            self.0.map(|coefficient| coefficient.value_at(position));
        Values {
            diffusion_rate_a,
            diffusion_rate_b,
            feed_rate,
            kill_rate,
            time_delta,
        }
    }
}
//
impl Default for Coefficients {
    /// Classic "mitosis" parameters, with the same value everywhere
    fn default() -> Self {
        Self([
            Coefficient::uniform(1.0),
            Coefficient::uniform(0.5),
            Coefficient::uniform(0.055),
            Coefficient::uniform(0.062),
            Coefficient::uniform(1.0),
        ])
    }
}
//
impl Index<CoefficientName> for Coefficients {
    type Output = Coefficient;

    fn index(&self, name: CoefficientName) -> &Coefficient {
        &self.0[name.index()]
    }
}
//
impl IndexMut<CoefficientName> for Coefficients {
    fn index_mut(&mut self, name: CoefficientName) -> &mut Coefficient {
        &mut self.0[name.index()]
    }
}

/// Coefficient values at one point of the field
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Values {
    /// Diffusion rate of species A
    pub diffusion_rate_a: Precision,

    /// Diffusion rate of species B
    pub diffusion_rate_b: Precision,

    /// Speed of the reaction that feeds A and removes B
    pub feed_rate: Precision,

    /// Rate at which B is removed
    pub kill_rate: Precision,

    /// Time step
    pub time_delta: Precision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_is_balanced() {
        let sum: Precision = STENCIL.iter().flatten().sum();
        assert!(sum.abs() < 1e-6);
    }

    #[test]
    fn names() {
        for (idx, name) in CoefficientName::ALL.into_iter().enumerate() {
            assert_eq!(name.index(), idx);
            assert_eq!(name.identifier().parse(), Ok(name));
            assert_eq!(name.to_string().parse(), Ok(name));
        }
        assert_eq!(
            "feed".parse::<CoefficientName>(),
            Err(UnknownCoefficient("feed".to_owned()))
        );
    }

    #[test]
    fn defaults() {
        let coefficients = Coefficients::default();
        let values = coefficients.values_at([0.3, 0.7]);
        assert_eq!(
            values,
            Values {
                diffusion_rate_a: 1.0,
                diffusion_rate_b: 0.5,
                feed_rate: 0.055,
                kill_rate: 0.062,
                time_delta: 1.0,
            }
        );
        assert!(coefficients.masks().iter().all(|mask| *mask == Mask::Solid));
    }

    #[test]
    fn setters() {
        let mut coefficients = Coefficients::default();
        let initial_masks = coefficients.masks();

        coefficients.set_range(CoefficientName::FeedRate, 0.01, 0.1);
        assert_eq!(coefficients.masks(), initial_masks);
        assert_eq!(coefficients[CoefficientName::FeedRate].min, 0.01);
        assert_eq!(coefficients.values_at([0.5, 0.5]).feed_rate, 0.1);

        coefficients.set_mask(CoefficientName::FeedRate, Mask::HardCircle);
        assert_ne!(coefficients.masks(), initial_masks);
        assert_eq!(coefficients.values_at([0.5, 0.5]).feed_rate, 0.01);
        assert_eq!(coefficients.values_at([0.0, 0.0]).feed_rate, 0.1);
        assert_eq!(coefficients[CoefficientName::KillRate].mask, Mask::Solid);
    }
}
