//! Foreground segmentation of single frames.
//!
//! Two strategies share the [`Segmenter`] interface:
//!
//! 1. [`ThresholdSegmenter`] for back-lit grayscale droplet
//! frames: crop, Otsu threshold with inverted polarity (the
//! dark droplet becomes foreground), morphological opening.
//!
//! 2. [`ColorRangeSegmenter`] for colour flame frames: HSV
//! band masks, unioned into one foreground mask, with the
//! per-band pixel counts reported alongside.
use imageproc::contrast;
use ndarray::{s, Array2, ArrayBase, Data, Ix2};

use crate::{
    color::to_hsv,
    config::{ColorBand, DropletConfig, FlameConfig},
    frame::{count, gray_image, ColorFrame, GrayFrame, Mask},
    morphology::open,
};

pub trait Segmenter {
    type Frame;
    type Output;

    /// Pure function of the frame and the segmenter's
    /// configuration. Never fails on a decoded frame; the
    /// worst case is an empty mask.
    fn segment(&self, frame: &Self::Frame) -> Self::Output;
}

pub struct ThresholdSegmenter {
    crop_fraction: f64,
    kernel_size: usize,
}

impl ThresholdSegmenter {
    pub fn new(config: &DropletConfig) -> Self {
        ThresholdSegmenter {
            crop_fraction: config.crop_fraction,
            kernel_size: config.kernel_size,
        }
    }

    /// Rows kept from a frame of the given height.
    pub fn cropped_rows(&self, height: usize) -> usize {
        ((height as f64 * self.crop_fraction) as usize).min(height)
    }
}

impl Segmenter for ThresholdSegmenter {
    type Frame = GrayFrame;
    type Output = Mask;

    fn segment(&self, frame: &GrayFrame) -> Mask {
        let rows = self.cropped_rows(frame.nrows());
        let cropped = frame.slice(s![..rows, ..]);

        let binary = match otsu_level(&cropped) {
            Some(level) => cropped.map(|&v| v <= level),
            None => Array2::from_elem(cropped.dim(), false),
        };
        open(&binary, self.kernel_size)
    }
}

/// Otsu's threshold: pixels at or below the level form one
/// class, the rest the other.
///
/// Returns `None` when the pixels take fewer than two
/// distinct values, as there is no split to make.
pub fn otsu_level<S: Data<Elem = u8>>(frame: &ArrayBase<S, Ix2>) -> Option<u8> {
    let first = *frame.iter().next()?;
    if frame.iter().all(|&v| v == first) {
        return None;
    }
    Some(contrast::otsu_level(&gray_image(frame)))
}

/// Union of the band masks plus each band's own pixel count.
#[derive(Debug, Clone)]
pub struct BandSegmentation {
    pub mask: Mask,

    /// Pixels inside each band, in configuration order,
    /// counted before the union and before any cleanup.
    pub band_pixels: Vec<usize>,
}

pub struct ColorRangeSegmenter {
    bands: Vec<ColorBand>,
    kernel_size: Option<usize>,
}

impl ColorRangeSegmenter {
    pub fn new(config: &FlameConfig) -> Self {
        ColorRangeSegmenter {
            bands: config.bands.clone(),
            kernel_size: config.kernel_size,
        }
    }

    pub fn bands(&self) -> &[ColorBand] {
        &self.bands
    }
}

impl Segmenter for ColorRangeSegmenter {
    type Frame = ColorFrame;
    type Output = BandSegmentation;

    fn segment(&self, frame: &ColorFrame) -> BandSegmentation {
        let hsv = to_hsv(frame);

        let mut mask = Array2::from_elem(hsv.dim(), false);
        let band_pixels = self
            .bands
            .iter()
            .map(|band| {
                let band_mask = hsv.map(|&p| band.contains(p));
                mask.zip_mut_with(&band_mask, |m, &b| *m |= b);
                count(&band_mask)
            })
            .collect();

        if let Some(k) = self.kernel_size {
            mask = open(&mask, k);
        }
        BandSegmentation { mask, band_pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let frame = Array2::from_shape_fn((20, 20), |(r, _)| if r < 5 { 30u8 } else { 200 });
        let level = otsu_level(&frame).unwrap();
        assert!((30..200).contains(&level));
    }

    #[test]
    fn otsu_needs_two_levels() {
        assert_eq!(otsu_level(&Array2::from_elem((5, 10), 7u8)), None);
        assert_eq!(otsu_level(&Array2::<u8>::zeros((0, 0))), None);
    }

    #[test]
    fn dark_object_becomes_foreground() {
        let frame = Array2::from_shape_fn((50, 40), |(r, c)| {
            if (5..15).contains(&r) && (10..20).contains(&c) {
                20
            } else {
                220
            }
        });
        let mask = ThresholdSegmenter::new(&DropletConfig::default()).segment(&frame);

        assert_eq!(mask.dim(), (30, 40));
        assert_eq!(count(&mask), 100);
        assert!(mask[[5, 10]] && mask[[14, 19]]);
        assert!(!mask[[4, 10]]);
    }

    #[test]
    fn crop_discards_bottom_band() {
        let frame = Array2::from_shape_fn((100, 20), |(r, _)| if r >= 70 { 0 } else { 255 });
        let mask = ThresholdSegmenter::new(&DropletConfig::default()).segment(&frame);
        assert_eq!(mask.nrows(), 60);
        assert_eq!(count(&mask), 0);
    }

    #[test]
    fn uniform_frame_is_empty() {
        let frame = Array2::from_elem((100, 100), 0u8);
        let mask = ThresholdSegmenter::new(&DropletConfig::default()).segment(&frame);
        assert_eq!(count(&mask), 0);
    }

    #[test]
    fn bands_are_counted_before_union() {
        let yellow = [255, 255, 0];
        let blue = [0, 0, 255];
        let frame = Array2::from_shape_fn((10, 10), |(r, _)| match r {
            0..=2 => yellow,
            3..=4 => blue,
            _ => [0, 0, 0],
        });
        let seg = ColorRangeSegmenter::new(&FlameConfig::default()).segment(&frame);

        assert_eq!(seg.band_pixels, vec![30, 20]);
        assert_eq!(count(&seg.mask), 50);
    }
}
