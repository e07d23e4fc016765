// THEORY:
// The `pipeline` module is the top-level API of the tracker. It wires the
// measurement front-end (`RedObjectDetector`) to the smoothing back-end (a `Ball`
// driven by a particle filter) and runs both exactly once per frame.
//
// The detector learns the scene for the lifetime of the pipeline. The ball is
// per-round state: `reset_ball` throws the whole particle ensemble away and
// starts a new one, while the background model keeps everything it has learned.

use crate::core_modules::ball::Ball;
use crate::core_modules::particle_filter::{FilterConfig, ParticleFilter};
use crate::core_modules::point::{Canvas, Point2D};
use crate::core_modules::red_detector::{DetectorConfig, RedObjectDetector};
use crate::core_modules::shape::{Shape, ShapeKind};
use crate::error::Result;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::background_model::BackgroundModelConfig;

/// Configuration for the TrackingPipeline. Every field has a default, so a
/// partial TOML document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub image_width: u32,
    pub image_height: u32,
    pub detector: DetectorConfig,
    pub filter: FilterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_width: 1280,
            image_height: 720,
            detector: DetectorConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn canvas(&self) -> Result<Canvas> {
        Canvas::new(self.image_width, self.image_height)
    }
}

/// What happened on a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    /// Zero-based index of the frame since the pipeline was created.
    pub frame_index: u64,
    /// The detector's raw output for this frame.
    pub measurement: Option<Point2D>,
    /// The ball position after the filter update.
    pub estimate: Point2D,
}

/// The main, top-level struct of the tracker.
pub struct TrackingPipeline {
    detector: RedObjectDetector,
    ball: Ball,
    config: PipelineConfig,
    canvas: Canvas,
    /// Seeds each new particle filter so that a seeded pipeline stays
    /// reproducible across resets.
    seeder: StdRng,
    frame_count: u64,
}

impl TrackingPipeline {
    /// Builds a pipeline with a circular ball at the centre of the canvas, seeded
    /// from OS entropy.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_seeder(config, StdRng::from_entropy())
    }

    /// Like [`TrackingPipeline::new`], but every random draw derives from `seed`.
    pub fn with_seed(config: PipelineConfig, seed: u64) -> Result<Self> {
        Self::with_seeder(config, StdRng::seed_from_u64(seed))
    }

    fn with_seeder(config: PipelineConfig, mut seeder: StdRng) -> Result<Self> {
        let canvas = config.canvas()?;
        let detector = RedObjectDetector::new(config.image_width, config.image_height, config.detector.clone())?;
        let ball = Self::spawn_ball(
            Shape::ball(ShapeKind::Circle),
            canvas.center(),
            &config.filter,
            canvas,
            &mut seeder,
        )?;
        info!(
            width = config.image_width,
            height = config.image_height,
            "tracking pipeline ready"
        );
        Ok(Self {
            detector,
            ball,
            config,
            canvas,
            seeder,
            frame_count: 0,
        })
    }

    fn spawn_ball(
        shape: Shape,
        start: Point2D,
        filter_config: &FilterConfig,
        canvas: Canvas,
        seeder: &mut StdRng,
    ) -> Result<Ball> {
        let rng = StdRng::seed_from_u64(seeder.next_u64());
        let filter = ParticleFilter::with_rng(start, filter_config.clone(), canvas, rng)?;
        Ok(Ball::with_filter(shape, filter))
    }

    /// Runs detection and tracking on one frame.
    ///
    /// Never fails: a frame the detector cannot use counts as a frame without a
    /// measurement, and the ball keeps moving on its own.
    pub fn process_frame(&mut self, frame: &RgbImage) -> FrameReport {
        // --- 1. Measurement ---
        let measurement = self.detector.detect(frame);

        // --- 2. Tracking ---
        self.ball.update(measurement);
        let estimate = self.ball.position();

        let report = FrameReport {
            frame_index: self.frame_count,
            measurement,
            estimate,
        };
        debug!(
            frame = report.frame_index,
            found = measurement.is_some(),
            x = estimate.x,
            y = estimate.y,
            "frame processed"
        );
        self.frame_count += 1;
        report
    }

    /// Replaces the ball (and its whole particle ensemble) with a fresh one.
    pub fn reset_ball(&mut self, shape: Shape, start: Point2D) -> Result<()> {
        self.ball = Self::spawn_ball(shape, start, &self.config.filter, self.canvas, &mut self.seeder)?;
        info!(x = start.x, y = start.y, shape = ?shape.kind(), "ball reset");
        Ok(())
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn detector(&self) -> &RedObjectDetector {
        &self.detector
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            image_width: 64,
            image_height: 48,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            image_width = 640

            [filter]
            num_particles = 50
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.image_width, 640);
        assert_eq!(config.image_height, 720);
        assert_eq!(config.filter.num_particles, 50);
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        let config = PipelineConfig {
            image_width: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            TrackingPipeline::with_seed(config, 1),
            Err(Error::InvalidCanvas { .. })
        ));
    }

    #[test]
    fn frames_are_numbered_in_order() {
        let mut pipeline = TrackingPipeline::with_seed(small_config(), 3).expect("valid pipeline");
        let black = RgbImage::new(64, 48);
        for expected in 0..4 {
            let report = pipeline.process_frame(&black);
            assert_eq!(report.frame_index, expected);
            assert_eq!(report.measurement, None);
        }
        assert_eq!(pipeline.frames_processed(), 4);
    }

    #[test]
    fn wrong_sized_frame_is_treated_as_missing() {
        let mut pipeline = TrackingPipeline::with_seed(small_config(), 3).expect("valid pipeline");
        let report = pipeline.process_frame(&RgbImage::new(10, 10));
        assert_eq!(report.measurement, None);
        assert_eq!(pipeline.ball().filter().len(), 300);
    }

    #[test]
    fn same_seed_gives_same_estimates() {
        let mut a = TrackingPipeline::with_seed(small_config(), 11).expect("valid pipeline");
        let mut b = TrackingPipeline::with_seed(small_config(), 11).expect("valid pipeline");
        let black = RgbImage::new(64, 48);
        for _ in 0..5 {
            assert_eq!(a.process_frame(&black), b.process_frame(&black));
        }
    }
}
