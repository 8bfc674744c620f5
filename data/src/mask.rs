//! Spatial masks that make simulation coefficients vary across the field

use crate::Precision;
use std::{f32::consts::PI, fmt, str::FromStr};
use thiserror::Error;

/// Squared radius of the hard circle mask, in normalized field coordinates
pub const HARD_CIRCLE_RADIUS2: Precision = 0.245;

/// Position within the field, normalized to [0, 1]² as [x, y]
///
/// The y axis points downwards, like row indices do.
pub type Position = [Precision; 2];

/// Function from normalized field position to a blend factor in [0, 1]
///
/// The blend factor is used to interpolate between a coefficient's minimal and
/// maximal value. Masks are immutable once built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mask {
    /// Always evaluates to 1, i.e. the coefficient's maximal value
    Solid,

    /// Linear ramp through the field center along a fixed direction
    LinearGradient(Gradient),

    /// 0 within a centered disk, 1 outside of it
    HardCircle,

    /// Linear falloff from 1 at the center to 0 at half the field size
    SmoothCircle,
}
//
impl Mask {
    /// Linear gradient along a certain angle, in radians
    pub fn linear_gradient(angle: Precision) -> Self {
        Self::LinearGradient(Gradient::new(angle))
    }

    /// Masks that a user interface should offer, in display order
    pub fn palette() -> [Self; 7] {
        [
            Self::Solid,
            Self::linear_gradient(0.0),
            Self::linear_gradient(3.0 * PI / 2.0),
            Self::linear_gradient(PI / 4.0),
            Self::linear_gradient(7.0 * PI / 4.0),
            Self::HardCircle,
            Self::SmoothCircle,
        ]
    }

    /// Short name of the mask kind, which also works as an identifier
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::LinearGradient(_) => "gradient",
            Self::HardCircle => "hard_circle",
            Self::SmoothCircle => "smooth_circle",
        }
    }

    /// Blend factor at a certain normalized position
    #[inline]
    pub fn factor(&self, [x, y]: Position) -> Precision {
        let [dx, dy] = [x - 0.5, y - 0.5];
        match self {
            Self::Solid => 1.0,
            Self::LinearGradient(gradient) => {
                let [ux, uy] = gradient.direction;
                (0.5 + dx * ux + dy * uy).clamp(0.0, 1.0)
            }
            Self::HardCircle => {
                if dx * dx + dy * dy < HARD_CIRCLE_RADIUS2 {
                    0.0
                } else {
                    1.0
                }
            }
            Self::SmoothCircle => {
                let distance = (4.0 * (dx * dx + dy * dy)).sqrt();
                (1.0 - distance).clamp(0.0, 1.0)
            }
        }
    }

    /// Value of a coefficient with range [min, max] at a certain position
    #[inline]
    pub fn blend(&self, min: Precision, max: Precision, position: Position) -> Precision {
        mix(min, max, self.factor(position))
    }
}
//
impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinearGradient(gradient) => {
                write!(f, "gradient:{}", gradient.angle.to_degrees())
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}
//
impl FromStr for Mask {
    type Err = MaskParseError;

    /// Parse a mask kind, with linear gradients written as `gradient:<degrees>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.split_once(':') {
            Some(("gradient", degrees)) => {
                let degrees = degrees
                    .trim()
                    .parse::<Precision>()
                    .map_err(|_| MaskParseError::BadAngle(degrees.to_owned()))?;
                Ok(Self::linear_gradient(degrees.to_radians()))
            }
            Some(_) => Err(MaskParseError::UnknownKind(s.to_owned())),
            None => match normalized.as_str() {
                "solid" => Ok(Self::Solid),
                "gradient" => Ok(Self::linear_gradient(0.0)),
                "hard_circle" => Ok(Self::HardCircle),
                "smooth_circle" => Ok(Self::SmoothCircle),
                _ => Err(MaskParseError::UnknownKind(s.to_owned())),
            },
        }
    }
}

/// Errors that can occur while parsing a mask description
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MaskParseError {
    #[error("unknown mask kind {0:?}, expected solid, gradient:<degrees>, hard-circle or smooth-circle")]
    UnknownKind(String),

    #[error("invalid gradient angle {0:?}, expected a number of degrees")]
    BadAngle(String),
}

/// Direction of a linear gradient mask
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Angle in radians
    angle: Precision,

    /// Unit vector along the angle, with the y axis pointing downwards
    direction: [Precision; 2],
}
//
impl Gradient {
    /// Set up a gradient along a certain angle, in radians
    pub fn new(angle: Precision) -> Self {
        Self {
            angle,
            direction: [angle.cos(), -angle.sin()],
        }
    }

    /// Angle of the gradient, in radians
    pub fn angle(&self) -> Precision {
        self.angle
    }

    /// Unit vector along which the gradient increases
    pub fn direction(&self) -> [Precision; 2] {
        self.direction
    }
}

/// GLSL-style linear interpolation
#[inline]
pub fn mix(x: Precision, y: Precision, t: Precision) -> Precision {
    x * (1.0 - t) + y * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    const CORNERS: [Position; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

    fn random_positions() -> impl Iterator<Item = Position> {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        std::iter::repeat_with(move || [rng.gen(), rng.gen()]).take(256)
    }

    #[test]
    fn solid_is_always_max() {
        for position in random_positions().chain(CORNERS) {
            assert_eq!(Mask::Solid.factor(position), 1.0);
            assert_eq!(Mask::Solid.blend(0.25, 0.75, position), 0.75);
        }
    }

    #[test]
    fn hard_circle() {
        assert_eq!(Mask::HardCircle.factor([0.5, 0.5]), 0.0);
        for corner in CORNERS {
            assert_eq!(Mask::HardCircle.factor(corner), 1.0);
        }
        for position in random_positions() {
            let factor = Mask::HardCircle.factor(position);
            assert!(factor == 0.0 || factor == 1.0);
        }
    }

    #[test]
    fn smooth_circle() {
        assert_eq!(Mask::SmoothCircle.factor([0.5, 0.5]), 1.0);
        assert_eq!(Mask::SmoothCircle.factor([0.0, 0.5]), 0.0);
        assert_eq!(Mask::SmoothCircle.factor([0.0, 0.0]), 0.0);
        assert!((Mask::SmoothCircle.factor([0.25, 0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gradient_direction() {
        // At angle 0, the factor increases from left to right
        let horizontal = Mask::linear_gradient(0.0);
        assert_eq!(horizontal.factor([0.5, 0.3]), 0.5);
        assert!(horizontal.factor([0.9, 0.5]) > horizontal.factor([0.1, 0.5]));

        // At angle pi/2, it increases upwards, i.e. towards lower rows
        let vertical = Mask::linear_gradient(PI / 2.0);
        assert!(vertical.factor([0.5, 0.1]) > vertical.factor([0.5, 0.9]));
        assert!((vertical.factor([0.5, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn factors_are_pure_and_bounded() {
        for mask in Mask::palette() {
            for position in random_positions().chain(CORNERS) {
                let factor = mask.factor(position);
                assert_eq!(factor.to_bits(), mask.factor(position).to_bits());
                assert!((0.0..=1.0).contains(&factor), "{mask} gave {factor}");
            }
        }
    }

    #[test]
    fn parsing() {
        assert_eq!("solid".parse(), Ok(Mask::Solid));
        assert_eq!("Hard-Circle".parse(), Ok(Mask::HardCircle));
        assert_eq!("smooth_circle".parse(), Ok(Mask::SmoothCircle));
        let Ok(Mask::LinearGradient(gradient)) = "gradient:90".parse::<Mask>() else {
            panic!("gradient should parse");
        };
        assert!((gradient.angle() - PI / 2.0).abs() < 1e-6);
        assert!(matches!(
            "gradient:north".parse::<Mask>(),
            Err(MaskParseError::BadAngle(_))
        ));
        assert!(matches!(
            "zigzag".parse::<Mask>(),
            Err(MaskParseError::UnknownKind(_))
        ));
    }
}
