use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_filled_circle_mut, draw_line_segment_mut};
use red_tracker::{FrameReport, PipelineConfig, Point2D, Shape, ShapeKind, TrackingPipeline};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_QUEUE_DEPTH: usize = 8;
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

const MEASUREMENT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const BALL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PARTICLE_COLOR: Rgb<u8> = Rgb([0, 160, 255]);

/// Replays a directory of still frames through the red marker tracker.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the frames, replayed in file name order.
    #[arg(short, long)]
    frames: PathBuf,

    /// Where to write annotated frames. Nothing is drawn when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with pipeline settings. Image size always comes from the frames.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the particle filter, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Shape of the tracked ball.
    #[arg(long, value_enum, default_value_t = ShapeArg::Circle)]
    shape: ShapeArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Circle,
    Square,
    Rectangle,
    Triangle,
}

impl From<ShapeArg> for ShapeKind {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Circle => ShapeKind::Circle,
            ShapeArg::Square => ShapeKind::Square,
            ShapeArg::Rectangle => ShapeKind::Rectangle,
            ShapeArg::Triangle => ShapeKind::Triangle,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(output) = &args.output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("failed to create output directory {}", output.display()))?;
    }

    // --- 2. Frame Source ---
    let paths = list_frames(&args.frames)?;
    if paths.is_empty() {
        bail!("no frames found in {}", args.frames.display());
    }
    info!(count = paths.len(), dir = %args.frames.display(), "replaying frames");
    let (tx, mut rx) = mpsc::channel::<(PathBuf, RgbImage)>(FRAME_QUEUE_DEPTH);
    let producer = tokio::spawn(decode_frames(paths, tx));

    // --- 3. Tracking Pipeline Initialization ---
    // The first frame decides the canvas size.
    let Some((first_path, first_frame)) = rx.recv().await else {
        producer.await??;
        bail!("no frame could be decoded");
    };
    config.image_width = first_frame.width();
    config.image_height = first_frame.height();
    let mut pipeline = match args.seed {
        Some(seed) => TrackingPipeline::with_seed(config, seed)?,
        None => TrackingPipeline::new(config)?,
    };
    let start = pipeline.ball().position();
    pipeline.reset_ball(Shape::ball(args.shape.into()), start)?;

    // --- 4. Main Processing Loop ---
    let mut detections = 0u64;
    let mut next = Some((first_path, first_frame));
    while let Some((path, frame)) = next {
        let report = pipeline.process_frame(&frame);
        if report.measurement.is_some() {
            detections += 1;
        }
        debug!(frame = %path.display(), measurement = ?report.measurement, "frame done");

        // --- 5. Visualization ---
        if let Some(output) = &args.output {
            let annotated = annotate(frame, &pipeline, &report);
            let file_name = path.file_name().context("frame path has no file name")?;
            let target = output.join(file_name).with_extension("png");
            annotated
                .save(&target)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }

        next = rx.recv().await;
    }
    producer.await??;

    let end = pipeline.ball().position();
    info!(
        frames = pipeline.frames_processed(),
        detections,
        x = end.x,
        y = end.y,
        "processing complete"
    );
    Ok(())
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_image {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decodes frames off the async runtime and hands them over in order. Frames
/// that fail to decode are skipped.
async fn decode_frames(paths: Vec<PathBuf>, tx: mpsc::Sender<(PathBuf, RgbImage)>) -> Result<()> {
    for path in paths {
        let decode_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || image::open(&decode_path).map(|img| img.to_rgb8())).await?;
        match decoded {
            Ok(frame) => {
                if tx.send((path, frame)).await.is_err() {
                    // Consumer stopped early.
                    break;
                }
            }
            Err(error) => warn!(frame = %path.display(), %error, "skipping undecodable frame"),
        }
    }
    Ok(())
}

/// Draws the particles, the ball outline and the raw measurement onto `frame`.
fn annotate(mut frame: RgbImage, pipeline: &TrackingPipeline, report: &FrameReport) -> RgbImage {
    for particle in pipeline.ball().filter().particles() {
        draw_cross_mut(&mut frame, PARTICLE_COLOR, particle.x as i32, particle.y as i32);
    }

    let outline = pipeline.ball().shape().outline(report.estimate);
    for (i, from) in outline.iter().enumerate() {
        let to = outline[(i + 1) % outline.len()];
        draw_line_segment_mut(&mut frame, as_f32(from), as_f32(&to), BALL_COLOR);
    }

    if let Some(tip) = report.measurement {
        draw_filled_circle_mut(&mut frame, (tip.x as i32, tip.y as i32), 6, MEASUREMENT_COLOR);
    }
    frame
}

fn as_f32(point: &Point2D) -> (f32, f32) {
    (point.x as f32, point.y as f32)
}
