//! Raw geometric measurements, in pixels.
use serde_derive::*;

use crate::{region::Region, segment::BandSegmentation};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMeasurement {
    /// Bounding-box height. Both the droplet diameter and the
    /// flame length are taken along the vertical only.
    pub vertical_px: usize,
    pub area_px: usize,
}

pub fn extract(region: &Region) -> RawMeasurement {
    RawMeasurement {
        vertical_px: vertical_extent(region),
        area_px: region.area,
    }
}

#[inline]
pub fn vertical_extent(region: &Region) -> usize {
    region.height
}

/// Per-band areas of a frame, taken from the full band masks
/// regardless of which region (if any) was selected.
pub fn band_areas(segmentation: &BandSegmentation) -> &[usize] {
    &segmentation.band_pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_horizontal_extent() {
        let region = Region {
            x: 3,
            y: 4,
            width: 80,
            height: 12,
            area: 500,
            label: 1,
        };
        assert_eq!(
            extract(&region),
            RawMeasurement {
                vertical_px: 12,
                area_px: 500
            }
        );
    }
}
