//! Brush strokes drawn by the user into the current field
//!
//! Strokes are expressed in field pixel coordinates, with x going right along
//! columns and y going down along rows. A stroke is a filled rectangle of width
//! [`LINE_W`] that runs along a segment, extended by half a pixel at each end.
//!
//! When the field wraps around, it behaves like an infinite plane tiled with
//! copies of itself, and a stroke that crosses a field edge must show up on
//! the other side. This is handled by walking the tiles that the segment
//! crosses, and drawing a copy of the stroke translated into each of them.

use crate::{array2, cell::Cell, edge::EdgeMode, Precision};
use ndarray::ArrayViewMut2;

/// Width of a brush stroke, in pixels
pub const LINE_W: Precision = 5.0;

/// Maximal number of tiles that a stroke may cross in a wrapping field
pub const MAX_TILE_CROSSINGS: usize = 10;

/// Largest tile index that a walk may start from
///
/// Beyond this, tile origins are no longer exactly representable.
const MAX_TILE_INDEX: Precision = (1u32 << 24) as Precision;

/// Horizontal offset applied to the end of vertical segments
const VERTICAL_NUDGE: Precision = 1e-3;

/// Cell state deposited by default: pure B, without any recorded change
pub const DEPOSIT: Cell = Cell::new(0.0, 1.0, 0.0);

/// Position in field pixel coordinates, as [x, y]
pub type Point = [Precision; 2];

/// Segment to be drawn into the field
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stroke {
    /// Start of the segment
    pub from: Point,

    /// End of the segment
    pub to: Point,

    /// State that covered cells are set to
    pub cell: Cell,
}
//
impl Stroke {
    /// Line between two points, depositing B
    pub fn line(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            cell: DEPOSIT,
        }
    }

    /// Roughly square dot centered on a point, depositing B
    pub fn dot([x, y]: Point) -> Self {
        Self::line([x - LINE_W / 2.0, y], [x + LINE_W / 2.0, y])
    }

    /// Deposit certain concentrations instead of the default
    pub fn with_values(self, a: Precision, b: Precision) -> Self {
        Self {
            cell: Cell::new(a, b, 0.0),
            ..self
        }
    }

    /// Same stroke, as seen from a tile whose top-left corner is at `origin`
    pub fn translated(&self, origin: Point) -> Self {
        Self {
            from: array2(|i| self.from[i] - origin[i]),
            to: array2(|i| self.to[i] - origin[i]),
            cell: self.cell,
        }
    }
}

/// What happened while drawing a stroke
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StrokeStats {
    /// Number of tiles into which a translated copy of the stroke was drawn
    pub tiles_visited: usize,

    /// Truth that the tile walk was stopped early, see [`TileWalk`]
    pub walk_aborted: bool,
}

/// Draw a stroke into a field view, whose shape is [rows, cols]
///
/// The stroke is always drawn once at its untranslated coordinates. In
/// repeating edge mode, translated copies are additionally drawn into every
/// tile of the periodic plane that the segment crosses.
pub fn draw(mut field: ArrayViewMut2<'_, Cell>, stroke: &Stroke, edge_mode: EdgeMode) -> StrokeStats {
    rasterize(field.view_mut(), stroke);
    let mut stats = StrokeStats::default();
    if edge_mode == EdgeMode::Repeat {
        let (rows, cols) = field.dim();
        let mut walk = TileWalk::new([cols as Precision, rows as Precision], stroke);
        for origin in &mut walk {
            rasterize(field.view_mut(), &stroke.translated(origin));
            stats.tiles_visited += 1;
        }
        stats.walk_aborted = walk.aborted();
    }
    stats
}

/// Set every cell whose center is covered by a stroke, ignoring cells that
/// fall outside of the field
pub fn rasterize(mut field: ArrayViewMut2<'_, Cell>, stroke: &Stroke) {
    let (rows, cols) = field.dim();
    let [x0, y0] = stroke.from;
    let [dx, dy] = [stroke.to[0] - x0, stroke.to[1] - y0];
    let length = (dx * dx + dy * dy).sqrt();
    let [ux, uy] = if length > 0.0 {
        [dx / length, dy / length]
    } else {
        [1.0, 0.0]
    };
    let half_width = LINE_W / 2.0;

    // Bounding box of the stroke, clipped to the field
    let margin = half_width + 1.0;
    let clip = |lo: Precision, hi: Precision, len: usize| {
        let start = (lo.min(hi) - margin).floor().max(0.0) as usize;
        let end = ((lo.max(hi) + margin).ceil().max(0.0) as usize).min(len);
        start..end
    };
    let row_range = clip(y0, stroke.to[1], rows);
    let col_range = clip(x0, stroke.to[0], cols);

    for row in row_range {
        let py = row as Precision + 0.5 - y0;
        for col in col_range.clone() {
            let px = col as Precision + 0.5 - x0;
            let along = px * ux + py * uy;
            let across = py * ux - px * uy;
            if (-0.5..length + 0.5).contains(&along) && (-half_width..half_width).contains(&across) {
                field[[row, col]] = stroke.cell;
            }
        }
    }
}

/// Iterator over the origins of the tiles that a segment crosses, in a plane
/// that is tiled with copies of a field of size [width, height]
///
/// Tiles are enumerated from left to right along the segment. The walk stops
/// early, with a warning, if the segment crosses more than
/// [`MAX_TILE_CROSSINGS`] tiles. It does not start at all if the tiles are
/// empty, or if the segment is not finite or lies too far from the origin.
#[derive(Clone, Debug)]
pub struct TileWalk {
    /// Tile dimensions as [width, height]
    tile_size: [Precision; 2],

    /// Horizontal coordinate where the segment ends
    end_x: Precision,

    /// Vertical slope of the segment
    aspect: Precision,

    /// Indices of the current tile
    tile: [i64; 2],

    /// Point of the segment where the current tile is entered
    cursor: Point,

    /// Number of tiles yielded so far
    visited: usize,

    /// Truth that the walk was stopped early
    aborted: bool,
}
//
impl TileWalk {
    /// Start walking the tiles crossed by a stroke
    pub fn new(tile_size: [Precision; 2], stroke: &Stroke) -> Self {
        let (mut from, mut to) = (stroke.from, stroke.to);
        if from[0] > to[0] {
            std::mem::swap(&mut from, &mut to);
        }
        if from[0] == to[0] {
            to[0] += VERTICAL_NUDGE;
        }
        let aspect = (to[1] - from[1]) / (to[0] - from[0]);
        let start = array2(|i| (from[i] / tile_size[i]).floor());
        let degenerate = tile_size.iter().any(|&size| size <= 0.0 || !size.is_finite())
            || to.iter().any(|coord| !coord.is_finite())
            || start.iter().any(|index| !index.is_finite() || index.abs() >= MAX_TILE_INDEX);
        if degenerate {
            log::warn!(
                "Not wrapping a stroke from {from:?} to {to:?} around a {tile_size:?} field, \
                its geometry is degenerate"
            );
        }
        Self {
            tile_size,
            end_x: to[0],
            aspect,
            tile: array2(|i| if degenerate { 0 } else { start[i] as i64 }),
            cursor: from,
            visited: 0,
            aborted: degenerate,
        }
    }

    /// Truth that the walk was stopped early
    pub fn aborted(&self) -> bool {
        self.aborted
    }
}
//
impl Iterator for TileWalk {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.aborted || self.cursor[0] >= self.end_x {
            return None;
        }
        if self.visited == MAX_TILE_CROSSINGS {
            log::warn!(
                "Stopped drawing a stroke after crossing {MAX_TILE_CROSSINGS} tiles, \
                its geometry is likely degenerate"
            );
            self.aborted = true;
            return None;
        }

        let [width, height] = self.tile_size;
        let [cell_x, cell_y] = array2(|i| self.tile[i] as Precision * self.tile_size[i]);
        let [cur_x, cur_y] = self.cursor;
        let new_y = cur_y + (cell_x + width - cur_x) * self.aspect;
        if new_y < cell_y {
            // Segment leaves through the top edge
            self.cursor = [cur_x + (cur_y - cell_y) / -self.aspect, cell_y];
            self.tile[1] = self.tile[1].checked_sub(1)?;
        } else if new_y > cell_y + height {
            // Segment leaves through the bottom edge
            self.cursor = [cur_x + (cell_y + height - cur_y) / self.aspect, cell_y + height];
            self.tile[1] = self.tile[1].checked_add(1)?;
        } else {
            // Segment leaves through the right edge
            self.cursor = [cell_x + width, new_y];
            self.tile[0] = self.tile[0].checked_add(1)?;
        }
        self.visited += 1;
        Some([cell_x, cell_y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn marked(field: &Array2<Cell>) -> Vec<[usize; 2]> {
        field
            .indexed_iter()
            .filter(|(_, cell)| **cell == DEPOSIT)
            .map(|((row, col), _)| [row, col])
            .collect()
    }

    #[test]
    fn walk_within_one_tile() {
        let stroke = Stroke::line([2.0, 3.0], [7.0, 6.0]);
        let mut walk = TileWalk::new([10.0, 10.0], &stroke);
        assert_eq!(walk.by_ref().collect::<Vec<_>>(), vec![[0.0, 0.0]]);
        assert!(!walk.aborted());
    }

    #[test]
    fn walk_across_three_tiles() {
        let stroke = Stroke::line([25.0, 5.0], [5.0, 5.0]);
        let mut walk = TileWalk::new([10.0, 10.0], &stroke);
        assert_eq!(
            walk.by_ref().collect::<Vec<_>>(),
            vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]
        );
        assert!(!walk.aborted());
    }

    #[test]
    fn walk_through_top_edge() {
        let stroke = Stroke::line([5.0, 2.0], [7.0, -4.0]);
        let walk = TileWalk::new([10.0, 10.0], &stroke);
        assert_eq!(walk.collect::<Vec<_>>(), vec![[0.0, 0.0], [0.0, -10.0]]);
    }

    #[test]
    fn vertical_walk_terminates() {
        let stroke = Stroke::line([4.0, 8.0], [4.0, 13.0]);
        let mut walk = TileWalk::new([10.0, 10.0], &stroke);
        assert_eq!(
            walk.by_ref().collect::<Vec<_>>(),
            vec![[0.0, 0.0], [0.0, 10.0]]
        );
        assert!(!walk.aborted());
    }

    #[test]
    fn degenerate_walk_is_bounded() {
        let stroke = Stroke::line([0.5, 0.5], [1000.0, 3000.0]);
        let mut walk = TileWalk::new([10.0, 10.0], &stroke);
        assert_eq!(walk.by_ref().count(), MAX_TILE_CROSSINGS);
        assert!(walk.aborted());
        assert_eq!(walk.next(), None);
    }

    #[test]
    fn far_away_walk_is_abandoned() {
        for stroke in [
            Stroke::line([1e25, 5.0], [2e25, 5.0]),
            Stroke::line([5.0, -1e30], [6.0, 1e30]),
            Stroke::line([Precision::NEG_INFINITY, 5.0], [3.0, 5.0]),
            Stroke::line([Precision::NAN, 5.0], [3.0, 5.0]),
        ] {
            let mut walk = TileWalk::new([10.0, 10.0], &stroke);
            assert_eq!(walk.next(), None);
            assert!(walk.aborted());
        }

        let mut field = Array2::from_elem([10, 10], Cell::NEUTRAL);
        let stats = draw(
            field.view_mut(),
            &Stroke::line([1e25, 5.0], [2e25, 5.0]),
            EdgeMode::Repeat,
        );
        assert_eq!(
            stats,
            StrokeStats {
                tiles_visited: 0,
                walk_aborted: true
            }
        );
        assert!(marked(&field).is_empty());
    }

    #[test]
    fn empty_field_walk_is_abandoned() {
        let mut field = Array2::from_elem([0, 16], Cell::NEUTRAL);
        let stats = draw(
            field.view_mut(),
            &Stroke::line([1.0, 1.0], [3.0, 1.0]),
            EdgeMode::Repeat,
        );
        assert_eq!(stats.tiles_visited, 0);
        assert!(stats.walk_aborted);
    }

    #[test]
    fn dot_footprint() {
        let mut field = Array2::from_elem([20, 20], Cell::NEUTRAL);
        rasterize(field.view_mut(), &Stroke::dot([10.0, 10.0]));
        let cells = marked(&field);
        assert_eq!(cells.len(), 6 * 5);
        assert!(cells.contains(&[10, 10]));
        assert!(cells
            .iter()
            .all(|&[row, col]| (7..12).contains(&row) && (7..13).contains(&col)));
    }

    #[test]
    fn custom_values() {
        let mut field = Array2::from_elem([8, 8], Cell::NEUTRAL);
        let stroke = Stroke::dot([4.0, 4.0]).with_values(0.25, 0.75);
        rasterize(field.view_mut(), &stroke);
        assert_eq!(field[[4, 4]], Cell::new(0.25, 0.75, 0.0));
    }

    #[test]
    fn wrapped_stroke_shows_up_on_both_sides() {
        let stroke = Stroke::line([-3.0, 5.0], [3.0, 5.0]);

        let mut repeat = Array2::from_elem([10, 10], Cell::NEUTRAL);
        let stats = draw(repeat.view_mut(), &stroke, EdgeMode::Repeat);
        assert_eq!(
            stats,
            StrokeStats {
                tiles_visited: 2,
                walk_aborted: false
            }
        );
        let row_5 = (0..10)
            .filter(|&col| repeat[[5, col]] == DEPOSIT)
            .collect::<Vec<_>>();
        assert_eq!(row_5, vec![0, 1, 2, 6, 7, 8, 9]);

        let mut mirror = Array2::from_elem([10, 10], Cell::NEUTRAL);
        let stats = draw(mirror.view_mut(), &stroke, EdgeMode::Mirror);
        assert_eq!(stats, StrokeStats::default());
        let row_5 = (0..10)
            .filter(|&col| mirror[[5, col]] == DEPOSIT)
            .collect::<Vec<_>>();
        assert_eq!(row_5, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_field_stroke_is_harmless() {
        let mut field = Array2::from_elem([10, 10], Cell::NEUTRAL);
        draw(
            field.view_mut(),
            &Stroke::line([-50.0, -50.0], [-40.0, -45.0]),
            EdgeMode::Mirror,
        );
        assert!(marked(&field).is_empty());
    }
}
