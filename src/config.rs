//! Immutable run configuration.
//!
//! Every pipeline component takes its settings from one of
//! these structures at construction. They deserialize from
//! JSON with every field optional (missing fields take the
//! defaults of the reference rig), and must pass
//! `validate` before any frame is read.
use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::*;

use crate::error::{MeasureError, Result};

/// Settings of the droplet-diameter run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DropletConfig {
    /// Fraction of rows (from the top) kept before
    /// thresholding. The bottom band of the frame carries a
    /// fixed artifact.
    pub crop_fraction: f64,

    /// Side of the square neighborhood used by the
    /// morphological opening. Must be odd.
    pub kernel_size: usize,

    /// Position of the calibration scanline as a fraction of
    /// the cropped height.
    pub scanline_fraction: f64,

    /// Physical width of the dark reference line, in mm.
    pub line_width_mm: f64,

    /// Capture rate in frames per second.
    pub frame_rate: f64,
}

impl Default for DropletConfig {
    fn default() -> Self {
        DropletConfig {
            crop_fraction: 0.6,
            kernel_size: 3,
            scanline_fraction: 0.5,
            line_width_mm: 0.2,
            frame_rate: 4000.,
        }
    }
}

impl DropletConfig {
    pub fn validate(&self) -> Result<()> {
        check_fraction("crop_fraction", self.crop_fraction)?;
        check_fraction("scanline_fraction", self.scanline_fraction)?;
        check_kernel(self.kernel_size)?;
        check_positive("line_width_mm", self.line_width_mm)?;
        check_positive("frame_rate", self.frame_rate)?;
        Ok(())
    }
}

/// An inclusive HSV box (8-bit OpenCV scale: hue in
/// `0..180`, saturation and value in `0..=255`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColorBand {
    pub name: String,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorBand {
    pub fn new<S: Into<String>>(name: S, lower: [u8; 3], upper: [u8; 3]) -> Self {
        ColorBand {
            name: name.into(),
            lower,
            upper,
        }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|ch| self.lower[ch] <= hsv[ch] && hsv[ch] <= self.upper[ch])
    }
}

/// Settings of the flame-structure run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlameConfig {
    /// Physical height of the optical window, in cm. The
    /// window spans the full frame height.
    pub window_height_cm: f64,

    /// Regions must be strictly larger than this (in pixels)
    /// to count as a flame.
    pub min_region_area: usize,

    /// Optional morphological opening of the combined mask.
    pub kernel_size: Option<usize>,

    pub bands: Vec<ColorBand>,

    /// Band whose accumulated area is the ratio numerator.
    pub numerator_band: String,

    /// Band whose accumulated area is the ratio denominator.
    pub denominator_band: String,
}

impl Default for FlameConfig {
    fn default() -> Self {
        FlameConfig {
            window_height_cm: 64.,
            min_region_area: 500,
            kernel_size: None,
            bands: vec![
                ColorBand::new("yellow", [20, 100, 100], [40, 255, 255]),
                ColorBand::new("blue", [100, 150, 50], [130, 255, 255]),
            ],
            numerator_band: "yellow".into(),
            denominator_band: "blue".into(),
        }
    }
}

impl FlameConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("window_height_cm", self.window_height_cm)?;
        if let Some(k) = self.kernel_size {
            check_kernel(k)?;
        }
        if self.bands.is_empty() {
            return Err(MeasureError::config("at least one color band is required"));
        }
        for (idx, band) in self.bands.iter().enumerate() {
            if (0..3).any(|ch| band.lower[ch] > band.upper[ch]) {
                return Err(MeasureError::config(format!(
                    "band `{}` has a lower bound above its upper bound",
                    band.name
                )));
            }
            if self.bands[..idx].iter().any(|b| b.name == band.name) {
                return Err(MeasureError::config(format!(
                    "band `{}` is defined twice",
                    band.name
                )));
            }
        }
        self.band_index(&self.numerator_band)?;
        self.band_index(&self.denominator_band)?;
        Ok(())
    }

    pub fn band_index(&self, name: &str) -> Result<usize> {
        self.bands
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| MeasureError::config(format!("no band named `{}`", name)))
    }
}

fn check_positive(name: &str, val: f64) -> Result<()> {
    if val.is_finite() && val > 0. {
        Ok(())
    } else {
        Err(MeasureError::config(format!(
            "`{}` must be positive and finite, got {}",
            name, val
        )))
    }
}

fn check_fraction(name: &str, val: f64) -> Result<()> {
    if val > 0. && val <= 1. {
        Ok(())
    } else {
        Err(MeasureError::config(format!(
            "`{}` must lie in (0, 1], got {}",
            name, val
        )))
    }
}

fn check_kernel(size: usize) -> Result<()> {
    if size % 2 == 1 {
        Ok(())
    } else {
        Err(MeasureError::config(format!(
            "kernel size must be odd, got {}",
            size
        )))
    }
}

/// File name template of an indexed frame sequence, e.g.
/// `Img{index:06}.tif`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    prefix: String,
    width: usize,
    suffix: String,
}

impl FilenamePattern {
    pub fn file_name(&self, index: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }
}

impl Default for FilenamePattern {
    fn default() -> Self {
        FilenamePattern {
            prefix: "Img".into(),
            width: 6,
            suffix: ".tif".into(),
        }
    }
}

impl FromStr for FilenamePattern {
    type Err = MeasureError;

    fn from_str(pattern: &str) -> Result<Self> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"\{index(?::0(\d+))?\}").unwrap();
        }

        let mut found = RE.captures_iter(pattern);
        let caps = found.next().ok_or_else(|| {
            MeasureError::config(format!("pattern `{}` has no {{index}} placeholder", pattern))
        })?;
        if found.next().is_some() {
            return Err(MeasureError::config(format!(
                "pattern `{}` has more than one placeholder",
                pattern
            )));
        }

        let width = match caps.get(1) {
            Some(w) => w
                .as_str()
                .parse()
                .map_err(|_| MeasureError::config(format!("bad width in `{}`", pattern)))?,
            None => 0,
        };
        let span = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        Ok(FilenamePattern {
            prefix: pattern[..span.start].into(),
            width,
            suffix: pattern[span.end..].into(),
        })
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width > 0 {
            write!(f, "{}{{index:0{}}}{}", self.prefix, self.width, self.suffix)
        } else {
            write!(f, "{}{{index}}{}", self.prefix, self.suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DropletConfig::default().validate().unwrap();
        FlameConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_physical_inputs() {
        let mut cfg = DropletConfig::default();
        cfg.line_width_mm = 0.;
        assert!(matches!(cfg.validate(), Err(MeasureError::Configuration(_))));

        let mut cfg = DropletConfig::default();
        cfg.kernel_size = 4;
        assert!(cfg.validate().is_err());

        let mut cfg = FlameConfig::default();
        cfg.window_height_cm = -1.;
        assert!(cfg.validate().is_err());

        let mut cfg = FlameConfig::default();
        cfg.denominator_band = "green".into();
        assert!(cfg.validate().is_err());

        let mut cfg = FlameConfig::default();
        cfg.bands[0].lower[0] = 50;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let cfg: FlameConfig = serde_json::from_str(r#"{ "min_region_area": 20 }"#)?;
        assert_eq!(cfg.min_region_area, 20);
        assert_eq!(cfg.bands.len(), 2);
        assert_eq!(cfg.window_height_cm, 64.);
        Ok(())
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let band = ColorBand::new("yellow", [20, 100, 100], [40, 255, 255]);
        assert!(band.contains([20, 100, 100]));
        assert!(band.contains([40, 255, 255]));
        assert!(!band.contains([19, 200, 200]));
        assert!(!band.contains([30, 99, 200]));
    }

    #[test]
    fn filename_pattern() -> anyhow::Result<()> {
        let pat: FilenamePattern = "Img{index:06}.tif".parse()?;
        assert_eq!(pat, FilenamePattern::default());
        assert_eq!(pat.file_name(42), "Img000042.tif");
        assert_eq!(pat.to_string(), "Img{index:06}.tif");

        let pat: FilenamePattern = "frame_{index}.png".parse()?;
        assert_eq!(pat.file_name(7), "frame_7.png");

        assert!("frame.png".parse::<FilenamePattern>().is_err());
        assert!("{index}_{index}.png".parse::<FilenamePattern>().is_err());
        Ok(())
    }
}
