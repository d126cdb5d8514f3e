//! Pixel to physical unit calibration.
//!
//! Two independent modes, never mixed within a run:
//!
//! - [`LineWidthCalibration`]: per frame, from the width of a
//! dark reference line of known physical width crossing a
//! fixed scanline of the binarized frame.
//!
//! - [`fixed_geometry`]: once per run, from the known
//! physical height of the imaging window spanning the frame.
use itertools::Itertools;
use serde_derive::*;

use crate::{
    config::DropletConfig,
    error::{MeasureError, Result},
    frame::Mask,
};

/// Physical units per pixel. Always positive and finite.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    pub fn new(units_per_pixel: f64) -> Result<Self> {
        if units_per_pixel.is_finite() && units_per_pixel > 0. {
            Ok(CalibrationFactor(units_per_pixel))
        } else {
            Err(MeasureError::CalibrationUnavailable(
                "scale is not positive and finite",
            ))
        }
    }

    #[inline]
    pub fn units_per_pixel(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn to_physical(&self, pixels: f64) -> f64 {
        pixels * self.0
    }
}

/// Widths of the foreground runs along a scanline.
///
/// The scanline is treated as padded with background at both
/// ends, so a run touching either end is still reported
/// whole.
pub fn foreground_runs<I: IntoIterator<Item = bool>>(scanline: I) -> Vec<usize> {
    scanline
        .into_iter()
        .dedup_with_count()
        .filter_map(|(len, on)| if on { Some(len) } else { None })
        .collect()
}

/// Median with the mean of the two middle values for even
/// counts.
fn median(values: &mut [usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.
    } else {
        values[mid] as f64
    })
}

pub struct LineWidthCalibration {
    line_width: f64,
    scanline_fraction: f64,
}

impl LineWidthCalibration {
    pub fn new(config: &DropletConfig) -> Result<Self> {
        config.validate()?;
        Ok(LineWidthCalibration {
            line_width: config.line_width_mm,
            scanline_fraction: config.scanline_fraction,
        })
    }

    pub fn scanline_row(&self, rows: usize) -> usize {
        ((rows as f64 * self.scanline_fraction) as usize).min(rows.saturating_sub(1))
    }

    /// Median foreground run width, in pixels, along the
    /// scanline of `mask`.
    pub fn reference_width(&self, mask: &Mask) -> Result<f64> {
        if mask.is_empty() {
            return Err(MeasureError::CalibrationUnavailable("empty frame"));
        }
        let scanline = mask.row(self.scanline_row(mask.nrows()));
        if scanline.iter().filter(|&&v| v).count() < 2 {
            return Err(MeasureError::CalibrationUnavailable(
                "no reference line on the scanline",
            ));
        }

        let mut widths = foreground_runs(scanline.iter().copied());
        let width = median(&mut widths).ok_or(MeasureError::CalibrationUnavailable(
            "no reference line on the scanline",
        ))?;
        if width == 0. {
            return Err(MeasureError::CalibrationUnavailable(
                "reference line has zero width",
            ));
        }
        Ok(width)
    }

    pub fn estimate(&self, mask: &Mask) -> Result<CalibrationFactor> {
        let width = self.reference_width(mask)?;
        CalibrationFactor::new(self.line_width / width)
    }
}

/// Scale of a window of known physical height imaged over
/// `frame_rows` pixel rows.
pub fn fixed_geometry(window_height: f64, frame_rows: usize) -> Result<CalibrationFactor> {
    if !(window_height.is_finite() && window_height > 0.) {
        return Err(MeasureError::config(format!(
            "window height must be positive, got {}",
            window_height
        )));
    }
    if frame_rows == 0 {
        return Err(MeasureError::CalibrationUnavailable("frame has no rows"));
    }
    CalibrationFactor::new(window_height / frame_rows as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn calibration() -> LineWidthCalibration {
        LineWidthCalibration::new(&DropletConfig::default()).unwrap()
    }

    fn scanline_mask(cols: usize, on: impl Fn(usize) -> bool) -> Mask {
        Array2::from_shape_fn((9, cols), |(r, c)| r == 4 && on(c))
    }

    #[test]
    fn runs_are_padded_with_background() {
        let line = |s: &str| s.bytes().map(|b| b == b'#').collect::<Vec<_>>();
        assert_eq!(foreground_runs(line("..##...###.")), vec![2, 3]);
        assert_eq!(foreground_runs(line("##...###")), vec![2, 3]);
        assert_eq!(foreground_runs(line("####")), vec![4]);
        assert!(foreground_runs(line("....")).is_empty());
    }

    #[test]
    fn median_of_even_count() {
        assert_eq!(median(&mut [4, 1, 3, 2]), Some(2.5));
        assert_eq!(median(&mut [5, 1, 3]), Some(3.));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn width_is_translation_invariant() -> anyhow::Result<()> {
        let cal = calibration();
        for offset in 0..20 {
            let mask = scanline_mask(40, |c| c >= offset && c < offset + 5);
            assert_eq!(cal.reference_width(&mask)?, 5.);
        }
        // Touching either end of the scanline.
        let mask = scanline_mask(40, |c| c >= 35);
        assert_eq!(cal.reference_width(&mask)?, 5.);
        Ok(())
    }

    #[test]
    fn unavailable_without_a_line() {
        let cal = calibration();
        let empty = scanline_mask(40, |_| false);
        assert!(matches!(
            cal.estimate(&empty),
            Err(MeasureError::CalibrationUnavailable(_))
        ));

        let single = scanline_mask(40, |c| c == 7);
        assert!(cal.estimate(&single).is_err());
    }

    #[test]
    fn factor_round_trips_to_known_width() -> anyhow::Result<()> {
        let cal = calibration();
        let mask = scanline_mask(60, |c| (10..14).contains(&c) || (30..34).contains(&c));
        let width = cal.reference_width(&mask)?;
        let factor = cal.estimate(&mask)?;
        assert!((factor.units_per_pixel() * width - 0.2).abs() < 1e-12);
        assert!((factor.units_per_pixel() - 0.05).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn fixed_geometry_scale() -> anyhow::Result<()> {
        let factor = fixed_geometry(64., 640)?;
        assert!((factor.units_per_pixel() - 0.1).abs() < 1e-12);
        assert!(matches!(
            fixed_geometry(0., 640),
            Err(MeasureError::Configuration(_))
        ));
        assert!(fixed_geometry(64., 0).is_err());
        Ok(())
    }

    #[test]
    fn factor_rejects_degenerate_scales() {
        assert!(CalibrationFactor::new(0.).is_err());
        assert!(CalibrationFactor::new(f64::INFINITY).is_err());
        assert!(CalibrationFactor::new(f64::NAN).is_err());
    }
}
