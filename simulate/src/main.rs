use clap::Parser;
use compute_selector::Simulation;
use data::{stroke::Point, Precision};
use engine::{Engine, View};
use eyre::{eyre, Result, WrapErr};
use image::RgbaImage;
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::{num::NonZeroUsize, path::PathBuf, sync::mpsc};
use ui::SharedArgs;

/// Run the masked Gray-Scott simulation and write frames as PNG images
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CLI arguments shared with other engine drivers
    #[command(flatten)]
    shared: SharedArgs<Simulation>,

    /// Number of images to be created
    #[arg(short = 'n', long, default_value_t = 100)]
    nbimage: usize,

    /// Number of simulation steps to perform between images
    #[arg(short = 'e', long, default_value_t = 34)]
    nbextrastep: usize,

    /// Directory where images are written
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Width of the images, defaults to the field width
    #[arg(long)]
    image_width: Option<u32>,

    /// Height of the images, defaults to the field height
    #[arg(long)]
    image_height: Option<u32>,

    /// Placement of the field within the images, as X,Y,WIDTH,HEIGHT in
    /// image pixels (the field fills the images by default)
    #[arg(long, value_parser = parse_view)]
    view: Option<View>,

    /// Hide the frame that is drawn around the field when a view is set
    #[arg(long)]
    no_frame: bool,

    /// Dot to be stamped before the simulation starts, as X,Y in field cells
    #[arg(long = "dot", value_parser = parse_point)]
    dots: Vec<Point>,

    /// Line to be drawn before the simulation starts, as X0,Y0,X1,Y1 in field
    /// cells
    #[arg(long = "line", value_parser = parse_line)]
    lines: Vec<[Point; 2]>,

    /// Size of the image buffer between the compute and I/O thread
    #[arg(long, default_value_t = NonZeroUsize::new(2).unwrap())]
    output_buffer: NonZeroUsize,

    /// Log to stderr instead of syslog
    #[arg(long)]
    stderr_log: bool,
}

fn main() -> Result<()> {
    // Parse CLI arguments and set up logging
    let args = Args::parse();
    ui::init_logging(args.stderr_log);

    // Set up the engine and apply the requested strokes
    let mut engine = Engine::<Simulation>::new(args.shared.engine_config(), args.shared.backend)
        .wrap_err("Failed to set up the engine")?;
    engine.toggle_frame_overlay(!args.no_frame);
    for &[x, y] in &args.dots {
        engine.draw_dot(x, y, None)?;
    }
    for &[from, to] in &args.lines {
        let stats = engine.draw_line(from, to, None)?;
        debug!("Drew line {from:?} -> {to:?} over {} tile(s)", stats.tiles_visited);
    }

    // Decide the image size
    let [field_width, field_height] = engine.field_size();
    let to_u32 = |len: usize| u32::try_from(len).wrap_err("Field is too large for an image");
    let image_width = args.image_width.map_or_else(|| to_u32(field_width), Ok)?;
    let image_height = args.image_height.map_or_else(|| to_u32(field_height), Ok)?;
    std::fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create output directory {:?}", args.output))?;

    // Set up progress reporting
    let progress = ui::init_progress_reporting("Generating image", args.nbimage);

    std::thread::scope(|s| -> Result<()> {
        // Start the writer thread
        let (sender, receiver) =
            mpsc::sync_channel::<(usize, RgbaImage)>(args.output_buffer.into());
        let output = &args.output;
        let writer = s.spawn(move || -> Result<()> {
            for (index, image) in receiver {
                let path = output.join(format!("frame_{index:05}.png"));
                image
                    .save(&path)
                    .wrap_err_with(|| format!("Failed to write {path:?}"))?;
                progress.inc(1);
            }
            Ok(())
        });

        // Run the simulation on the main thread
        for index in 0..args.nbimage {
            engine.iterate(args.nbextrastep)?;
            let mut image = RgbaImage::new(image_width, image_height);
            engine.draw(args.view, &mut image)?;
            if sender.send((index, image)).is_err() {
                break;
            }
        }
        std::mem::drop(sender);
        writer
            .join()
            .map_err(|_| eyre!("Image writer thread panicked"))?
    })?;
    info!("Wrote {} images to {:?}", args.nbimage, args.output);
    Ok(())
}

/// Parse a comma-separated list of N numbers
fn parse_numbers<const N: usize>(s: &str) -> Result<[Precision; N], String> {
    let numbers = s
        .split(',')
        .map(|x| x.trim().parse::<Precision>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bad number in {s:?}: {e}"))?;
    <[Precision; N]>::try_from(numbers)
        .map_err(|numbers| format!("expected {N} numbers, got {}", numbers.len()))
}

fn parse_point(s: &str) -> Result<Point, String> {
    parse_numbers(s)
}

fn parse_line(s: &str) -> Result<[Point; 2], String> {
    let [x0, y0, x1, y1] = parse_numbers(s)?;
    Ok([[x0, y0], [x1, y1]])
}

fn parse_view(s: &str) -> Result<View, String> {
    let [x, y, width, height] = parse_numbers(s)?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("view {s:?} must have a positive size"));
    }
    Ok(View {
        x,
        y,
        width,
        height,
    })
}
