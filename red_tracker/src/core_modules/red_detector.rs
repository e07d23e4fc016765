// THEORY:
// The `RedObjectDetector` is the measurement front-end of the tracker. It owns the
// only piece of state in the detection path (the background model) and runs every
// frame through a fixed sequence of stages, turning raw pixels into at most one
// point: the tip of the largest moving red blob.
//
// Key architectural principles:
// 1.  **Motion gating**: Colour alone is not trusted. A red sofa in the background
//     must never be reported, so the colour mask is intersected with the
//     background model's foreground mask before any geometry runs.
// 2.  **Stateful by necessity**: Every call to `detect` feeds the background model,
//     even when nothing is found. Callers must present every frame, in order.
// 3.  **Absence is normal**: A frame without a usable blob yields `None`; only a
//     frame of the wrong size is an error, and `detect` downgrades even that to a
//     logged `None` so that the game loop never has to stop.

use crate::core_modules::background_model::{BackgroundModel, BackgroundModelConfig};
use crate::core_modules::contour::locate_tip;
use crate::core_modules::mask::{clean, color_mask, count_set, keep_foreground};
use crate::core_modules::pixel::pixel::{HsvRange, RED_HIGH_RANGE, RED_LOW_RANGE};
use crate::core_modules::point::Point2D;
use crate::error::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Tunable behaviour of the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub background: BackgroundModelConfig,
    /// HSV windows that count as "red". Red wraps around the hue circle, so the
    /// default needs two.
    pub red_ranges: Vec<HsvRange>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            background: BackgroundModelConfig::default(),
            red_ranges: vec![RED_LOW_RANGE, RED_HIGH_RANGE],
        }
    }
}

/// Finds the tip of the largest moving red object in a stream of frames.
pub struct RedObjectDetector {
    background: BackgroundModel,
    red_ranges: Vec<HsvRange>,
}

impl RedObjectDetector {
    pub fn new(width: u32, height: u32, config: DetectorConfig) -> Result<Self> {
        Ok(Self {
            background: BackgroundModel::new(width, height, config.background)?,
            red_ranges: config.red_ranges,
        })
    }

    /// Processes one frame and returns the detected tip, if any.
    ///
    /// Fails only when `frame` does not match the dimensions the detector was
    /// built for; the background model is left untouched in that case.
    pub fn try_detect(&mut self, frame: &RgbImage) -> Result<Option<Point2D>> {
        // --- 1. Motion ---
        let foreground = self.background.apply(frame)?;

        // --- 2. Colour ---
        let red = color_mask(frame, &self.red_ranges);

        // --- 3. Combine & Clean ---
        let moving_red = keep_foreground(&red, foreground);
        let cleaned = clean(&moving_red);
        trace!(
            red = count_set(&red),
            moving_red = count_set(&moving_red),
            cleaned = count_set(&cleaned),
            "mask pixel counts"
        );

        // --- 4. Geometry ---
        let tip = locate_tip(&cleaned);
        match tip {
            Some(point) => debug!(x = point.x, y = point.y, "red object detected"),
            None => trace!("no red object in frame"),
        }
        Ok(tip)
    }

    /// Like [`RedObjectDetector::try_detect`], but a mismatched frame is logged
    /// and treated as a frame with no detection.
    pub fn detect(&mut self, frame: &RgbImage) -> Option<Point2D> {
        match self.try_detect(frame) {
            Ok(tip) => tip,
            Err(error) => {
                warn!(%error, "skipping frame");
                None
            }
        }
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn red_ranges(&self) -> &[HsvRange] {
        &self.red_ranges
    }
}
