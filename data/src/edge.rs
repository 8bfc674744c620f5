//! Handling of the field boundaries

use std::{fmt, str::FromStr};
use thiserror::Error;

/// What happens when the simulation or the display looks past a field edge
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum EdgeMode {
    /// The field is a torus, i.e. an infinite periodic tiling of itself
    #[default]
    Repeat,

    /// The field is reflected at its edges
    Mirror,
}
//
impl EdgeMode {
    /// Numerical code of this mode, as used by compute kernels
    pub const fn code(self) -> u32 {
        match self {
            Self::Repeat => 0,
            Self::Mirror => 1,
        }
    }

    /// Map a possibly out-of-bounds index along an axis of length `len` to a
    /// valid index along that axis
    ///
    /// Mirroring reflects around the outer edge of the boundary cells, so that
    /// index -1 maps to 0 and index `len` maps to `len - 1`.
    #[inline]
    pub fn resolve(self, idx: isize, len: usize) -> usize {
        debug_assert!(len > 0);
        let len = len as isize;
        let resolved = match self {
            Self::Repeat => idx.rem_euclid(len),
            Self::Mirror => {
                let period = idx.rem_euclid(2 * len);
                if period < len {
                    period
                } else {
                    2 * len - 1 - period
                }
            }
        };
        resolved as usize
    }
}
//
impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Repeat => "repeat",
            Self::Mirror => "mirror",
        })
    }
}
//
impl FromStr for EdgeMode {
    type Err = UnknownEdgeMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repeat" | "wrap" => Ok(Self::Repeat),
            "mirror" | "mirrored_repeat" => Ok(Self::Mirror),
            _ => Err(UnknownEdgeMode(s.to_owned())),
        }
    }
}

/// Attempted to parse an unknown edge mode
#[derive(Clone, Debug, Error, PartialEq)]
#[error("unknown edge mode {0:?}, expected repeat or mirror")]
pub struct UnknownEdgeMode(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_bounds_indices_are_unchanged() {
        for mode in [EdgeMode::Repeat, EdgeMode::Mirror] {
            for idx in 0..7 {
                assert_eq!(mode.resolve(idx, 7), idx as usize);
            }
        }
    }

    #[test]
    fn repeat() {
        assert_eq!(EdgeMode::Repeat.resolve(-1, 5), 4);
        assert_eq!(EdgeMode::Repeat.resolve(5, 5), 0);
        assert_eq!(EdgeMode::Repeat.resolve(-11, 5), 4);
    }

    #[test]
    fn mirror() {
        assert_eq!(EdgeMode::Mirror.resolve(-1, 5), 0);
        assert_eq!(EdgeMode::Mirror.resolve(-2, 5), 1);
        assert_eq!(EdgeMode::Mirror.resolve(5, 5), 4);
        assert_eq!(EdgeMode::Mirror.resolve(6, 5), 3);
        assert_eq!(EdgeMode::Mirror.resolve(10, 5), 0);
        assert_eq!(EdgeMode::Mirror.resolve(-1, 1), 0);
    }

    #[test]
    fn parsing() {
        assert_eq!("wrap".parse(), Ok(EdgeMode::Repeat));
        assert_eq!("Mirror".parse(), Ok(EdgeMode::Mirror));
        assert!("clamp".parse::<EdgeMode>().is_err());
    }
}
