// THEORY:
// The `BackgroundModel` is the temporal memory of the detector. For every pixel
// location it learns what "static" looks like and flags the pixels of a new frame
// that do not fit, which isolates moving objects from the scene behind them.
//
// Key architectural principles:
// 1.  **Per-Pixel Mixture**: Each location keeps up to `MAX_MODES` isotropic RGB
//     Gaussians (weight, mean, variance). Several modes let a pixel learn more than
//     one "normal" appearance, such as a flickering screen or swaying foliage.
// 2.  **Adaptive Learning**: The learning rate starts high and settles at
//     `1 / history`, so the model locks onto a new scene quickly and then adapts
//     slowly to lighting drift.
// 3.  **Background Selection**: Modes are kept sorted by weight. The heaviest modes
//     whose cumulative weight stays below `BACKGROUND_RATIO` describe the
//     background; a pixel close to one of them (within `var_threshold` squared
//     standard deviations) is background.
// 4.  **Shadow Awareness**: A foreground pixel that is just a darker copy of a
//     background colour is classified as a shadow. Shadows are reported separately
//     so that consumers can treat them as background.
// 5.  **Owned, Long-Lived State**: The model is created once per detector and is
//     updated on every frame, whether or not anything is detected.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Error, Result};
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

const MAX_MODES: usize = 5;
const BACKGROUND_RATIO: f32 = 0.9;
const GENERATION_THRESHOLD: f32 = 9.0;
const INITIAL_VARIANCE: f32 = 15.0;
const MIN_VARIANCE: f32 = 4.0;
const MAX_VARIANCE: f32 = 75.0;
const COMPLEXITY_REDUCTION: f32 = 0.05;
const SHADOW_BRIGHTNESS_MIN: f32 = 0.5;

pub const FOREGROUND_VALUE: u8 = 255;
pub const SHADOW_VALUE: u8 = 127;
pub const BACKGROUND_VALUE: u8 = 0;

/// Tunable behaviour of the background model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundModelConfig {
    /// Number of frames that effectively make up the model's memory.
    pub history: u32,
    /// Squared Mahalanobis distance under which a pixel matches a background mode.
    /// Lower values make the model more sensitive.
    pub var_threshold: f32,
    /// Whether to mark darkened background pixels as shadows instead of foreground.
    pub detect_shadows: bool,
}

impl Default for BackgroundModelConfig {
    fn default() -> Self {
        Self {
            history: 100,
            var_threshold: 16.0,
            detect_shadows: true,
        }
    }
}

impl BackgroundModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history == 0 {
            return Err(Error::InvalidHistory);
        }
        if !(self.var_threshold.is_finite() && self.var_threshold > 0.0) {
            return Err(Error::InvalidVarThreshold(self.var_threshold));
        }
        Ok(())
    }
}

/// The classification of a single pixel in the latest frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Background,
    Foreground,
    /// Foreground that is only a darkened copy of the background.
    Shadow,
}

impl PixelClass {
    pub fn mask_value(self) -> u8 {
        match self {
            PixelClass::Background => BACKGROUND_VALUE,
            PixelClass::Foreground => FOREGROUND_VALUE,
            PixelClass::Shadow => SHADOW_VALUE,
        }
    }
}

/// One Gaussian component of a pixel's appearance model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GaussianMode {
    weight: f32,
    mean: [f32; 3],
    variance: f32,
}

impl GaussianMode {
    fn new(weight: f32, sample: [f32; 3]) -> Self {
        Self {
            weight,
            mean: sample,
            variance: INITIAL_VARIANCE,
        }
    }

    fn distance_squared(&self, sample: &[f32; 3]) -> f32 {
        self.mean
            .iter()
            .zip(sample)
            .map(|(m, s)| (m - s).powi(2))
            .sum()
    }
}

/// A per-pixel adaptive Gaussian mixture model of the static scene.
pub struct BackgroundModel {
    width: u32,
    height: u32,
    config: BackgroundModelConfig,
    /// `MAX_MODES` slots per pixel, heaviest first.
    modes: Vec<GaussianMode>,
    /// How many slots of each pixel are in use.
    modes_used: Vec<u8>,
    /// The classification mask for the most recent frame.
    foreground_mask: GrayImage,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32, config: BackgroundModelConfig) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidCanvas { width, height });
        }
        let num_pixels = (width as usize) * (height as usize);
        debug!(width, height, history = config.history, "background model created");
        Ok(Self {
            width,
            height,
            config,
            modes: vec![GaussianMode::default(); num_pixels * MAX_MODES],
            modes_used: vec![0; num_pixels],
            foreground_mask: GrayImage::new(width, height),
            frames_seen: 0,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &BackgroundModelConfig {
        &self.config
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// The mask produced by the most recent call to [`BackgroundModel::apply`].
    pub fn foreground_mask(&self) -> &GrayImage {
        &self.foreground_mask
    }

    /// Learns from `frame` and classifies each of its pixels.
    ///
    /// The returned mask holds `FOREGROUND_VALUE`, `SHADOW_VALUE` or
    /// `BACKGROUND_VALUE` per pixel. The very first frame has nothing to compare
    /// against and comes back entirely as foreground.
    pub fn apply(&mut self, frame: &RgbImage) -> Result<&GrayImage> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::FrameSizeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        self.frames_seen += 1;
        let learning_rate =
            1.0 / (2 * self.frames_seen).min(u64::from(self.config.history)) as f32;

        for (index, rgb) in frame.pixels().enumerate() {
            let sample = Pixel::from(rgb).channels_f32();
            let class = self.update_pixel(index, &sample, learning_rate);
            let x = index as u32 % self.width;
            let y = index as u32 / self.width;
            self.foreground_mask
                .put_pixel(x, y, Luma([class.mask_value()]));
        }

        Ok(&self.foreground_mask)
    }

    /// Updates the mixture of a single pixel and returns its classification.
    fn update_pixel(&mut self, index: usize, sample: &[f32; 3], learning_rate: f32) -> PixelClass {
        let start = index * MAX_MODES;
        let used = self.modes_used[index] as usize;
        let modes = &mut self.modes[start..start + MAX_MODES];

        let retention = 1.0 - learning_rate;
        let prune = learning_rate * COMPLEXITY_REDUCTION;
        let var_threshold = self.config.var_threshold;

        // --- 1. Match & Update ---
        let mut is_background = false;
        let mut fitted = false;
        let mut cumulative_weight = 0.0;
        for mode in modes[..used].iter_mut() {
            let mut weight = retention * mode.weight - prune;
            if !fitted {
                let dist2 = mode.distance_squared(sample);
                if cumulative_weight < BACKGROUND_RATIO && dist2 < var_threshold * mode.variance {
                    is_background = true;
                }
                if dist2 < GENERATION_THRESHOLD * mode.variance {
                    fitted = true;
                    weight += learning_rate;
                    let gain = learning_rate / weight;
                    for (mean, value) in mode.mean.iter_mut().zip(sample) {
                        *mean += gain * (value - *mean);
                    }
                    mode.variance = (mode.variance + gain * (dist2 - mode.variance))
                        .clamp(MIN_VARIANCE, MAX_VARIANCE);
                }
            }
            if weight < prune {
                weight = 0.0;
            }
            mode.weight = weight;
            cumulative_weight += weight;
        }

        // --- 2. Prune, Sort & Renormalize ---
        let mut used = Self::sort_and_prune(&mut modes[..used]);
        if cumulative_weight > 0.0 {
            let total: f32 = modes[..used].iter().map(|mode| mode.weight).sum();
            for mode in modes[..used].iter_mut() {
                mode.weight /= total;
            }
        }

        // --- 3. Classify (against the model before any new mode is added) ---
        let class = if is_background {
            PixelClass::Background
        } else if self.config.detect_shadows && Self::is_shadow(&modes[..used], sample, var_threshold) {
            PixelClass::Shadow
        } else {
            PixelClass::Foreground
        };

        // --- 4. Spawn a New Mode ---
        if !fitted {
            if used == 0 {
                modes[0] = GaussianMode::new(1.0, *sample);
                used = 1;
            } else {
                for mode in modes[..used].iter_mut() {
                    mode.weight *= retention;
                }
                let slot = if used == MAX_MODES { MAX_MODES - 1 } else { used };
                modes[slot] = GaussianMode::new(learning_rate, *sample);
                used = slot + 1;
                Self::sort_and_prune(&mut modes[..used]);
            }
        }

        self.modes_used[index] = used as u8;
        class
    }

    /// Sorts modes heaviest first and returns how many carry non-zero weight.
    fn sort_and_prune(modes: &mut [GaussianMode]) -> usize {
        modes.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
        modes.iter().take_while(|mode| mode.weight > 0.0).count()
    }

    /// Checks whether `sample` is a darkened copy of one of the background modes.
    fn is_shadow(modes: &[GaussianMode], sample: &[f32; 3], var_threshold: f32) -> bool {
        let mut cumulative_weight = 0.0;
        for mode in modes {
            let numerator: f32 = mode.mean.iter().zip(sample).map(|(m, s)| m * s).sum();
            let denominator: f32 = mode.mean.iter().map(|m| m * m).sum();
            if denominator == 0.0 {
                return false;
            }

            if numerator <= denominator && numerator >= SHADOW_BRIGHTNESS_MIN * denominator {
                let brightness = numerator / denominator;
                let dist2: f32 = mode
                    .mean
                    .iter()
                    .zip(sample)
                    .map(|(m, s)| (brightness * m - s).powi(2))
                    .sum();
                if dist2 < var_threshold * mode.variance * brightness * brightness {
                    return true;
                }
            }

            cumulative_weight += mode.weight;
            if cumulative_weight > BACKGROUND_RATIO {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn learned_model(frames: usize) -> BackgroundModel {
        let mut model = BackgroundModel::new(16, 16, BackgroundModelConfig::default())
            .expect("valid config");
        let scene = solid(16, 16, [100, 100, 100]);
        for _ in 0..frames {
            model.apply(&scene).expect("matching size");
        }
        model
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_history = BackgroundModelConfig {
            history: 0,
            ..Default::default()
        };
        assert_eq!(zero_history.validate(), Err(Error::InvalidHistory));

        let bad_threshold = BackgroundModelConfig {
            var_threshold: 0.0,
            ..Default::default()
        };
        assert!(BackgroundModel::new(4, 4, bad_threshold).is_err());
    }

    #[test]
    fn first_frame_is_all_foreground() {
        let model = learned_model(1);
        assert!(model
            .foreground_mask()
            .pixels()
            .all(|p| p.0[0] == FOREGROUND_VALUE));
    }

    #[test]
    fn static_scene_becomes_background() {
        let model = learned_model(20);
        assert_eq!(model.frames_seen(), 20);
        assert!(model
            .foreground_mask()
            .pixels()
            .all(|p| p.0[0] == BACKGROUND_VALUE));
    }

    #[test]
    fn moving_patch_is_foreground() {
        let mut model = learned_model(30);
        let mut frame = solid(16, 16, [100, 100, 100]);
        for y in 4..8 {
            for x in 4..8 {
                frame.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        let mask = model.apply(&frame).expect("matching size");
        assert_eq!(mask.get_pixel(5, 5).0[0], FOREGROUND_VALUE);
        assert_eq!(mask.get_pixel(12, 12).0[0], BACKGROUND_VALUE);
    }

    #[test]
    fn darkened_background_is_shadow() {
        let mut model = learned_model(30);
        let mask = model
            .apply(&solid(16, 16, [60, 60, 60]))
            .expect("matching size");
        assert_eq!(mask.get_pixel(0, 0).0[0], SHADOW_VALUE);
    }

    #[test]
    fn shadows_are_foreground_when_detection_is_off() {
        let config = BackgroundModelConfig {
            detect_shadows: false,
            ..Default::default()
        };
        let mut model = BackgroundModel::new(8, 8, config).expect("valid config");
        for _ in 0..30 {
            model
                .apply(&solid(8, 8, [100, 100, 100]))
                .expect("matching size");
        }
        let mask = model
            .apply(&solid(8, 8, [60, 60, 60]))
            .expect("matching size");
        assert_eq!(mask.get_pixel(3, 3).0[0], FOREGROUND_VALUE);
    }

    #[test]
    fn mismatched_frame_is_reported() {
        let mut model = learned_model(1);
        let result = model.apply(&solid(8, 8, [0, 0, 0]));
        assert!(matches!(result, Err(Error::FrameSizeMismatch { .. })));
    }
}
