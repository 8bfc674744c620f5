//! Mapping of the raw simulation field to displayable colors
//!
//! The field is composited into an RGBA image. By default it fills the whole
//! image, but a [`View`] can place it anywhere in the image, in which case the
//! rest of the image shows periodic copies of the field, following the
//! current edge mode. With the frame overlay on, these copies are dimmed and a
//! thin frame is drawn just outside of the field.

use data::{cell::Cell, edge::EdgeMode, mask::mix, Precision};
use image::RgbaImage;
use ndarray::ArrayView2;
use rayon::prelude::*;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Width of the frame overlay, relative to the field size
const FRAME_WIDTH: Precision = 0.005;

/// Opacity of the field within the frame overlay
const FRAME_OPACITY: Precision = 0.2;

/// Opacity of the field copies outside of the frame
const OUTSIDE_OPACITY: Precision = 0.6;

/// Gray level that the field is blended with outside of the field
const BACKGROUND: Precision = 0.5;

/// Amplification of the change channel in [`ColorMode::Change`]
const CHANGE_SCALE: Precision = 50.0;

/// Color mapping preset
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum ColorMode {
    /// Bright where A dominates, dark where B dominates
    #[default]
    Grayscale,

    /// Colorized variants of [`Grayscale`](ColorMode::Grayscale)
    Inferno,
    Viridis,
    Magma,
    Turbo,

    /// Diverging map of the recent variation of concentrations
    Change,
}
//
impl ColorMode {
    /// All presets
    pub const ALL: [Self; 6] = [
        Self::Grayscale,
        Self::Inferno,
        Self::Viridis,
        Self::Magma,
        Self::Turbo,
        Self::Change,
    ];

    /// Key under which the preset is selected
    pub fn key(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Inferno => "inferno",
            Self::Viridis => "viridis",
            Self::Magma => "magma",
            Self::Turbo => "turbo",
            Self::Change => "change",
        }
    }

    /// Color of a cell, as RGB components in [0, 1]
    #[inline]
    pub fn color(self, cell: Cell) -> [Precision; 3] {
        let intensity = ((cell.a - cell.b) * 2.0).clamp(0.0, 1.0);
        let gradient = match self {
            Self::Grayscale => return [intensity; 3],
            Self::Inferno => colorous::INFERNO,
            Self::Viridis => colorous::VIRIDIS,
            Self::Magma => colorous::MAGMA,
            Self::Turbo => colorous::TURBO,
            Self::Change => {
                let t = (0.5 + cell.change * CHANGE_SCALE).clamp(0.0, 1.0);
                return rgb(colorous::RED_BLUE.eval_continuous(f64::from(t)));
            }
        };
        rgb(gradient.eval_continuous(f64::from(intensity)))
    }
}
//
impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
//
impl FromStr for ColorMode {
    type Err = UnknownColorMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.key() == s)
            .ok_or_else(|| UnknownColorMode(s.to_owned()))
    }
}

/// Error returned when parsing an unknown color preset key
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown color mode {0:?}")]
pub struct UnknownColorMode(pub String);

/// Convert a colorous color to RGB components in [0, 1]
fn rgb(color: colorous::Color) -> [Precision; 3] {
    [color.r, color.g, color.b].map(|c| Precision::from(c) / 255.0)
}

/// Placement of the field within the output image, in output pixels
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct View {
    pub x: Precision,
    pub y: Precision,
    pub width: Precision,
    pub height: Precision,
}

/// Compositing settings
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Composition {
    /// Placement of the field, or None to fill the output
    pub view: Option<View>,

    /// Handling of out-of-field positions
    pub edge_mode: EdgeMode,

    /// Color mapping
    pub color_mode: ColorMode,

    /// Truth that the frame overlay is visible (only applies to views)
    pub frame_visible: bool,
}
//
impl Composition {
    /// Normalized field position at the center of an output pixel
    #[inline]
    fn position(&self, [px, py]: [usize; 2], [width, height]: [u32; 2]) -> [Precision; 2] {
        let [cx, cy] = [px as Precision + 0.5, py as Precision + 0.5];
        match self.view {
            None => [cx / width as Precision, cy / height as Precision],
            Some(view) => [(cx - view.x) / view.width, (cy - view.y) / view.height],
        }
    }

    /// Opacity of the field at some normalized position
    #[inline]
    fn opacity(&self, position: [Precision; 2]) -> Precision {
        if !(self.frame_visible && self.view.is_some()) {
            return 1.0;
        }
        let within = |lo: Precision, hi: Precision| position.iter().all(|&p| p >= lo && p <= hi);
        if within(0.0, 1.0) {
            1.0
        } else if within(-FRAME_WIDTH, 1.0 + FRAME_WIDTH) {
            FRAME_OPACITY
        } else {
            OUTSIDE_OPACITY
        }
    }

    /// Render a field into an output image
    pub fn render(&self, field: ArrayView2<'_, Cell>, output: &mut RgbaImage) {
        let dimensions @ [out_width, out_height] = [output.width(), output.height()];
        let (rows, cols) = field.dim();
        if out_width == 0 || out_height == 0 || rows == 0 || cols == 0 {
            return;
        }
        output
            .par_chunks_exact_mut(out_width as usize * 4)
            .enumerate()
            .for_each(|(py, pixels)| {
                for (px, pixel) in pixels.chunks_exact_mut(4).enumerate() {
                    let position @ [x, y] = self.position([px, py], dimensions);
                    let col = self
                        .edge_mode
                        .resolve((x * cols as Precision).floor() as isize, cols);
                    let row = self
                        .edge_mode
                        .resolve((y * rows as Precision).floor() as isize, rows);
                    let color = self.color_mode.color(field[[row, col]]);
                    let opacity = self.opacity(position);
                    for (dst, component) in pixel.iter_mut().zip(color) {
                        *dst = (mix(BACKGROUND, component, opacity) * 255.0).round() as u8;
                    }
                    pixel[3] = u8::MAX;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn composition(view: Option<View>) -> Composition {
        Composition {
            view,
            edge_mode: EdgeMode::Repeat,
            color_mode: ColorMode::Grayscale,
            frame_visible: true,
        }
    }

    #[test]
    fn color_mode_keys() {
        for mode in ColorMode::ALL {
            assert_eq!(mode.key().parse(), Ok(mode));
        }
        assert_eq!(
            "sepia".parse::<ColorMode>(),
            Err(UnknownColorMode("sepia".to_owned()))
        );
    }

    #[test]
    fn grayscale_mapping() {
        assert_eq!(ColorMode::Grayscale.color(Cell::NEUTRAL), [1.0; 3]);
        assert_eq!(ColorMode::Grayscale.color(Cell::new(0.0, 1.0, 0.0)), [0.0; 3]);
        assert_eq!(ColorMode::Grayscale.color(Cell::new(0.5, 0.25, 0.0)), [0.5; 3]);
    }

    #[test]
    fn field_fills_output_without_view() {
        let mut field = Array2::from_elem((4, 8), Cell::NEUTRAL);
        field[[0, 0]] = Cell::new(0.0, 1.0, 0.0);
        let mut output = RgbaImage::new(16, 8);
        composition(None).render(field.view(), &mut output);
        assert_eq!(output.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(output.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(output.get_pixel(2, 0).0, [255, 255, 255, 255]);
        assert_eq!(output.get_pixel(15, 7).0, [255, 255, 255, 255]);
    }

    #[test]
    fn view_dims_outside_copies() {
        let field = Array2::from_elem((8, 8), Cell::NEUTRAL);
        let mut output = RgbaImage::new(32, 32);
        let view = View {
            x: 8.0,
            y: 8.0,
            width: 16.0,
            height: 16.0,
        };
        composition(Some(view)).render(field.view(), &mut output);
        assert_eq!(output.get_pixel(16, 16).0, [255, 255, 255, 255]);
        assert_eq!(output.get_pixel(1, 1).0, [204, 204, 204, 255]);

        let mut no_frame = composition(Some(view));
        no_frame.frame_visible = false;
        no_frame.render(field.view(), &mut output);
        assert_eq!(output.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn copies_follow_edge_mode() {
        let mut field = Array2::from_elem((1, 4), Cell::NEUTRAL);
        field[[0, 0]] = Cell::new(0.0, 1.0, 0.0);
        let view = View {
            x: 4.0,
            y: 0.0,
            width: 4.0,
            height: 1.0,
        };
        let mut output = RgbaImage::new(12, 1);
        let mut settings = composition(Some(view));
        settings.frame_visible = false;

        // Copy to the left of the field
        settings.render(field.view(), &mut output);
        assert_eq!(output.get_pixel(0, 0).0[0], 0);
        assert_eq!(output.get_pixel(3, 0).0[0], 255);

        settings.edge_mode = EdgeMode::Mirror;
        settings.render(field.view(), &mut output);
        assert_eq!(output.get_pixel(0, 0).0[0], 255);
        assert_eq!(output.get_pixel(3, 0).0[0], 0);
        assert_eq!(output.get_pixel(4, 0).0[0], 0);
    }
}
