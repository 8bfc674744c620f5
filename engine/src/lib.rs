//! Interactive masked Gray-Scott reaction-diffusion engine
//!
//! The [`Engine`] owns the simulation field, the live coefficients and the
//! compute backend. It is what a user interface talks to: strokes are drawn
//! into the field, coefficients and their masks are edited between batches of
//! simulation steps, and the field is composited into images for display.

pub mod compositor;
pub mod config;

pub use self::{
    compositor::{ColorMode, UnknownColorMode, View},
    config::EngineConfig,
};
use self::compositor::Composition;
use compute::{kernel::KernelId, Simulate, SimulateCreate};
use data::{
    cell::Cell,
    coefficients::{CoefficientName, Coefficients},
    edge::EdgeMode,
    field::FieldPair,
    mask::Mask,
    stroke::{self, Point, Stroke, StrokeStats},
    Precision, PRECISION_BITS,
};
use image::RgbaImage;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use ndarray::ArrayView2;
use rand::prelude::*;
use thiserror::Error;

/// Fraction of the field, around its center, where initial dots are placed
const SEEDING_SPREAD: f64 = 0.9;

/// Masked Gray-Scott simulation engine, running on compute backend `S`
pub struct Engine<S: SimulateCreate + Simulate> {
    /// Compute backend
    simulation: S,

    /// Simulation state
    field: FieldPair<S::Field>,

    /// Authoritative copy of the coefficients
    coefficients: Coefficients,

    /// Handling of the field edges, by the simulation and by strokes
    edge_mode: EdgeMode,

    /// Color mapping of composited images
    color_mode: ColorMode,

    /// Truth that the frame overlay is drawn around views
    frame_visible: bool,
}
//
impl<S: SimulateCreate + Simulate> Engine<S> {
    /// Set up the engine, then seed the field with random dots
    ///
    /// The field size must be supported by the backend.
    pub fn new(config: EngineConfig, args: S::CliArgs) -> Result<Self, EngineError<S::Error>> {
        let EngineConfig {
            size: [width, height],
            initial_dots,
            seed,
            coefficients,
            edge_mode,
            color_mode,
            frame_visible,
        } = config;
        let simulation = S::new(&coefficients, args)?;
        check_field_size([width, height], simulation.max_field_size())?;
        let field = simulation.make_field_pair([height, width])?;
        let mut engine = Self {
            simulation,
            field,
            coefficients,
            edge_mode,
            color_mode,
            frame_visible,
        };
        engine.seed(initial_dots, seed)?;
        info!(
            "Engine ready with a {width}x{height} field and {}",
            engine.kernel_id()
        );
        Ok(engine)
    }

    /// Stamp dots at random positions around the center of the field
    fn seed(&mut self, dots: usize, seed: u64) -> Result<(), S::Error> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let [width, height] = self.field_size();
        let mut coordinate = |len: usize| {
            (len as f64 * (0.5 + (rng.gen::<f64>() - 0.5) * SEEDING_SPREAD)).floor() as Precision
        };
        let centers = (0..dots)
            .map(|_| [coordinate(width), coordinate(height)])
            .collect::<Vec<_>>();
        let edge_mode = self.edge_mode;
        self.field.modify_current(|mut view| {
            for center in centers {
                stroke::draw(view.view_mut(), &Stroke::dot(center), edge_mode);
            }
        })?;
        debug!("Seeded the field with {dots} dots");
        Ok(())
    }

    /// Current simulation coefficients
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Masks that coefficients can be given
    pub fn masks(&self) -> [Mask; 7] {
        Mask::palette()
    }

    /// Give a coefficient a new mask
    ///
    /// A new kernel is compiled if this changes the set of masks in use. If
    /// compilation fails, the coefficient keeps its previous mask.
    pub fn set_coefficient_mask(&mut self, name: CoefficientName, mask: Mask) -> Result<(), S::Error> {
        let mut coefficients = self.coefficients;
        coefficients.set_mask(name, mask);
        self.update_coefficients(coefficients)
    }

    /// Change the value range of a coefficient, keeping its mask
    pub fn set_coefficient_range(
        &mut self,
        name: CoefficientName,
        min: Precision,
        max: Precision,
    ) -> Result<(), S::Error> {
        let mut coefficients = self.coefficients;
        coefficients.set_range(name, min, max);
        self.update_coefficients(coefficients)
    }

    /// Propagate new coefficients to the backend, then adopt them
    fn update_coefficients(&mut self, coefficients: Coefficients) -> Result<(), S::Error> {
        self.simulation.update_coefficients(&coefficients)?;
        self.coefficients = coefficients;
        Ok(())
    }

    /// Current handling of the field edges
    pub fn wrap_mode(&self) -> EdgeMode {
        self.edge_mode
    }

    /// Change the handling of the field edges
    pub fn set_wrap_mode(&mut self, edge_mode: EdgeMode) {
        debug!("Switching to {edge_mode} edge mode");
        self.edge_mode = edge_mode;
    }

    /// Current color mapping
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Change the color mapping
    pub fn set_color_mode(&mut self, color_mode: ColorMode) {
        self.color_mode = color_mode;
    }

    /// Change the color mapping, identified by its key
    pub fn set_color_mode_key(&mut self, key: &str) -> Result<(), UnknownColorMode> {
        self.color_mode = key.parse()?;
        Ok(())
    }

    /// Truth that the frame overlay is visible
    pub fn frame_visible(&self) -> bool {
        self.frame_visible
    }

    /// Show or hide the frame overlay
    pub fn toggle_frame_overlay(&mut self, visible: bool) {
        self.frame_visible = visible;
    }

    /// Advance the simulation by `steps` time steps
    pub fn iterate(&mut self, steps: usize) -> Result<(), S::Error> {
        self.simulation
            .perform_steps(&mut self.field, self.edge_mode, steps)
    }

    /// Composite the current field into an image
    ///
    /// Without a view, the field fills the image. With a view, the field is
    /// placed at the view's rectangle, and the rest of the image shows copies
    /// of the field that follow the edge mode.
    pub fn draw(&self, view: Option<View>, output: &mut RgbaImage) -> Result<(), S::Error> {
        let composition = Composition {
            view,
            edge_mode: self.edge_mode,
            color_mode: self.color_mode,
            frame_visible: self.frame_visible,
        };
        self.field
            .read_current(|field| composition.render(field, output))?;
        Ok(())
    }

    /// Stamp a dot centered at (x, y), in field cells
    ///
    /// Deposits B unless other (a, b) concentrations are specified.
    pub fn draw_dot(
        &mut self,
        x: Precision,
        y: Precision,
        values: Option<[Precision; 2]>,
    ) -> Result<StrokeStats, S::Error> {
        self.draw_stroke(Stroke::dot([x, y]), values)
    }

    /// Draw a line between two points, in field cells
    ///
    /// Deposits B unless other (a, b) concentrations are specified. In
    /// repeating edge mode, the line wraps around the field edges.
    pub fn draw_line(
        &mut self,
        from: Point,
        to: Point,
        values: Option<[Precision; 2]>,
    ) -> Result<StrokeStats, S::Error> {
        self.draw_stroke(Stroke::line(from, to), values)
    }

    /// Draw a stroke into the current field
    fn draw_stroke(
        &mut self,
        stroke: Stroke,
        values: Option<[Precision; 2]>,
    ) -> Result<StrokeStats, S::Error> {
        let stroke = match values {
            Some([a, b]) => stroke.with_values(a, b),
            None => stroke,
        };
        let edge_mode = self.edge_mode;
        Ok(self
            .field
            .modify_current(|view| stroke::draw(view, &stroke, edge_mode))?)
    }

    /// Change the field size, given as [width, height]
    ///
    /// The region that the old and new sizes have in common is preserved,
    /// anchored at the top-left corner.
    pub fn resize(&mut self, [width, height]: [usize; 2]) -> Result<(), EngineError<S::Error>> {
        check_field_size([width, height], self.max_field_size())?;
        self.field
            .resize([height, width])
            .map_err(|e| EngineError::Backend(e.into()))
    }

    /// Reset the field to the neutral state
    pub fn clear(&mut self) -> Result<(), S::Error> {
        Ok(self.field.clear()?)
    }

    /// Largest supported field width or height
    pub fn max_field_size(&self) -> usize {
        self.simulation.max_field_size()
    }

    /// Current field size as [width, height]
    pub fn field_size(&self) -> [usize; 2] {
        let [rows, cols] = self.field.shape();
        [cols, rows]
    }

    /// Identity of the kernel that the simulation currently uses
    pub fn kernel_id(&self) -> KernelId {
        self.simulation.kernel_id()
    }

    /// Number of bits of the floating-point numbers that the field is made of
    pub fn precision_bits(&self) -> usize {
        PRECISION_BITS
    }

    /// Inspect the current field, whose shape is [height, width]
    pub fn read_field<R>(&self, reader: impl FnOnce(ArrayView2<'_, Cell>) -> R) -> Result<R, S::Error> {
        Ok(self.field.read_current(reader)?)
    }
}

/// Check that a field size, given as [width, height], is within 1..=max_size
fn check_field_size<E: std::error::Error + 'static>(
    size: [usize; 2],
    max_size: usize,
) -> Result<(), EngineError<E>> {
    if size.iter().any(|&len| len == 0 || len > max_size) {
        return Err(EngineError::UnsupportedSize { size, max_size });
    }
    Ok(())
}

/// Errors that can occur while operating the engine
#[derive(Debug, Error)]
pub enum EngineError<E: std::error::Error + 'static> {
    #[error("compute backend failed")]
    Backend(#[from] E),

    #[error("field size {size:?} is not within 1..={max_size}")]
    UnsupportedSize { size: [usize; 2], max_size: usize },
}
