// THEORY:
// Binary masks are the glue between the per-pixel analysers and the geometric
// stage. This module builds the "red" mask from HSV thresholds, intersects it with
// the motion mask, and cleans the result so that only solid, blob-like regions
// survive to contour extraction.
//
// Cleanup order matters: erosion first strips isolated speckles, dilation then
// restores the surviving blobs to roughly their original size, and the final blur
// softens jagged edges so the contour tracer yields fewer, smoother boundaries.

use crate::core_modules::background_model::FOREGROUND_VALUE;
use crate::core_modules::pixel::pixel::{HsvRange, Pixel};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Rounds of 3x3 erosion applied before dilation.
const EROSION_ITERATIONS: u8 = 2;
/// Rounds of 3x3 dilation applied after erosion.
const DILATION_ITERATIONS: u8 = 2;
/// Sigma of a 7-tap Gaussian kernel: 0.3 * ((7 - 1) * 0.5 - 1) + 0.8.
const BLUR_SIGMA: f32 = 1.4;

/// Marks every pixel whose HSV value falls inside any of `ranges`.
pub fn color_mask(frame: &RgbImage, ranges: &[HsvRange]) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let hsv = Pixel::from(frame.get_pixel(x, y)).to_hsv();
        if ranges.iter().any(|range| range.contains(&hsv)) {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

/// Keeps `mask` pixels only where the background model reported true foreground.
/// Shadow pixels count as background.
pub fn keep_foreground(mask: &GrayImage, foreground: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let is_on = mask.get_pixel(x, y).0[0] != MASK_OFF;
        let is_moving = foreground.get_pixel(x, y).0[0] == FOREGROUND_VALUE;
        if is_on && is_moving {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

/// Erodes, dilates and blurs a binary mask. Any non-zero pixel of the result
/// should be treated as set.
pub fn clean(mask: &GrayImage) -> GrayImage {
    let eroded = erode(mask, Norm::LInf, EROSION_ITERATIONS);
    let dilated = dilate(&eroded, Norm::LInf, DILATION_ITERATIONS);
    gaussian_blur_f32(&dilated, BLUR_SIGMA)
}

pub fn count_set(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] != MASK_OFF).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::background_model::SHADOW_VALUE;
    use crate::core_modules::pixel::pixel::{RED_HIGH_RANGE, RED_LOW_RANGE};
    use image::Rgb;

    fn square_mask(size: u32, from: u32, to: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (from..to).contains(&x) && (from..to).contains(&y) {
                Luma([MASK_ON])
            } else {
                Luma([MASK_OFF])
            }
        })
    }

    #[test]
    fn red_on_both_ends_of_the_hue_circle_is_selected() {
        let mut frame = RgbImage::from_pixel(3, 1, Rgb([0, 0, 200]));
        frame.put_pixel(0, 0, Rgb([220, 10, 10]));
        frame.put_pixel(1, 0, Rgb([220, 10, 40]));
        let mask = color_mask(&frame, &[RED_LOW_RANGE, RED_HIGH_RANGE]);
        assert_eq!(mask.get_pixel(0, 0).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(1, 0).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(2, 0).0[0], MASK_OFF);
    }

    #[test]
    fn shadows_do_not_pass_the_foreground_filter() {
        let mask = GrayImage::from_pixel(3, 1, Luma([MASK_ON]));
        let mut foreground = GrayImage::new(3, 1);
        foreground.put_pixel(0, 0, Luma([FOREGROUND_VALUE]));
        foreground.put_pixel(1, 0, Luma([SHADOW_VALUE]));
        let kept = keep_foreground(&mask, &foreground);
        assert_eq!(kept.get_pixel(0, 0).0[0], MASK_ON);
        assert_eq!(kept.get_pixel(1, 0).0[0], MASK_OFF);
        assert_eq!(kept.get_pixel(2, 0).0[0], MASK_OFF);
    }

    #[test]
    fn speckles_are_removed() {
        let speck = square_mask(20, 9, 11);
        assert_eq!(count_set(&clean(&speck)), 0);
    }

    #[test]
    fn solid_blobs_survive_cleanup() {
        let blob = square_mask(40, 10, 30);
        let cleaned = clean(&blob);
        assert!(cleaned.get_pixel(20, 20).0[0] > 250);
        assert!(count_set(&cleaned) >= 400);
        assert_eq!(cleaned.get_pixel(0, 0).0[0], MASK_OFF);
    }
}
