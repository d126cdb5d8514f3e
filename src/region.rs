//! Connected regions of a mask and selection of the region
//! of interest.
//!
//! Only external regions are reported: a foreground
//! component lying inside a hole of another component is part
//! of its enclosing region, and so are the holes themselves.
//! A region's area is therefore the pixel count of the filled
//! outline, the raster analogue of an external contour's
//! area.
//!
//! Regions are labelled in scan order (top to bottom, left to
//! right, by their first pixel), which fixes the tie-break
//! when several regions share the maximum area.
use image::{GrayImage, Luma};
pub use imageproc::region_labelling::Connectivity;
use imageproc::region_labelling::connected_components;
use serde_derive::*;

use crate::frame::{mask_image, Mask};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Connectivity of the background that keeps the
/// foreground/background topology consistent.
pub fn dual(conn: Connectivity) -> Connectivity {
    match conn {
        Connectivity::Four => Connectivity::Eight,
        Connectivity::Eight => Connectivity::Four,
    }
}

/// Bounding box and area of one external region.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub area: usize,

    /// Scan-order label of the region in its mask
    /// (1-based).
    pub label: usize,
}

/// `image` with every hole filled: background pixels that
/// cannot reach the frame border become foreground.
fn fill_holes(image: &GrayImage, conn: Connectivity) -> GrayImage {
    let background = connected_components(image, dual(conn), FOREGROUND);
    let (width, height) = background.dimensions();

    let mut outside = vec![false; 1];
    let mut mark = |label: u32| {
        let label = label as usize;
        if label >= outside.len() {
            outside.resize(label + 1, false);
        }
        outside[label] = true;
    };
    for x in 0..width {
        mark(background.get_pixel(x, 0)[0]);
        mark(background.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        mark(background.get_pixel(0, y)[0]);
        mark(background.get_pixel(width - 1, y)[0]);
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = background.get_pixel(x, y)[0] as usize;
        match label {
            0 => FOREGROUND,
            l if outside.get(l).copied().unwrap_or(false) => BACKGROUND,
            _ => FOREGROUND,
        }
    })
}

/// External regions of `mask`, in scan order.
pub fn external_regions(mask: &Mask, conn: Connectivity) -> Vec<Region> {
    if !mask.iter().any(|&v| v) {
        return vec![];
    }
    let filled = fill_holes(&mask_image(mask), conn);
    let labels = connected_components(&filled, conn, BACKGROUND);

    let mut slots: Vec<Option<Region>> = vec![];
    let mut order = vec![];
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        let (x, y) = (x as usize, y as usize);
        if label > slots.len() {
            slots.resize(label, None);
        }
        let r = slots[label - 1].get_or_insert_with(|| {
            order.push(label);
            Region {
                x,
                y,
                width: 1,
                height: 1,
                area: 0,
                label: 0,
            }
        });
        r.area += 1;
        if x < r.x {
            r.width += r.x - x;
            r.x = x;
        }
        r.width = r.width.max(x - r.x + 1);
        r.height = y - r.y + 1;
    }

    // Renumber by first pixel in scan order.
    order
        .into_iter()
        .enumerate()
        .filter_map(|(idx, label)| {
            slots[label - 1].take().map(|r| Region {
                label: idx + 1,
                ..r
            })
        })
        .collect()
}

/// Picks the single region of interest of a mask.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    connectivity: Connectivity,
    min_area: Option<usize>,
}

impl Default for RegionSelector {
    fn default() -> Self {
        RegionSelector {
            connectivity: Connectivity::Eight,
            min_area: None,
        }
    }
}

impl RegionSelector {
    /// Selected regions must have an area strictly greater
    /// than `min_area`.
    pub fn with_min_area(min_area: usize) -> Self {
        RegionSelector {
            min_area: Some(min_area),
            ..Default::default()
        }
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// The largest external region, or `None` for an empty
    /// mask or when the largest region is too small. On ties
    /// the first region in scan order wins.
    pub fn select(&self, mask: &Mask) -> Option<Region> {
        let largest = external_regions(mask, self.connectivity)
            .into_iter()
            .fold(None, |best: Option<Region>, r| match best {
                Some(b) if b.area >= r.area => Some(b),
                _ => Some(r),
            })?;

        match self.min_area {
            Some(min) if largest.area <= min => None,
            _ => Some(largest),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn mask_from(rows: &[&str]) -> Mask {
        let cols = rows[0].len();
        Array2::from_shape_fn((rows.len(), cols), |(r, c)| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn empty_mask_has_no_region() {
        let mask = Array2::from_elem((100, 100), false);
        assert!(external_regions(&mask, Connectivity::Eight).is_empty());
        assert_eq!(RegionSelector::default().select(&mask), None);
    }

    #[test]
    fn selects_largest() {
        let mask = mask_from(&[
            "##.......",
            "##...###.",
            ".....###.",
            ".....###.",
            "#........",
        ]);
        let region = RegionSelector::default().select(&mask).unwrap();
        assert_eq!(
            region,
            Region {
                x: 5,
                y: 1,
                width: 3,
                height: 3,
                area: 9,
                label: 2,
            }
        );
    }

    #[test]
    fn ties_go_to_first_in_scan_order() {
        let mask = mask_from(&[
            "......##",
            "......##",
            "##......",
            "##......",
        ]);
        let region = RegionSelector::default().select(&mask).unwrap();
        assert_eq!((region.x, region.y, region.label), (6, 0, 1));

        // Deterministic across calls.
        assert_eq!(RegionSelector::default().select(&mask), Some(region));
    }

    #[test]
    fn diagonal_pixels_join_under_eight_connectivity() {
        let mask = mask_from(&["#..", ".#.", "..#"]);
        assert_eq!(external_regions(&mask, Connectivity::Eight).len(), 1);
        assert_eq!(external_regions(&mask, Connectivity::Four).len(), 3);
    }

    #[test]
    fn holes_and_nested_blobs_belong_to_outer_region() {
        let mask = mask_from(&[
            ".........",
            ".#######.",
            ".#.....#.",
            ".#..#..#.",
            ".#.....#.",
            ".#######.",
            ".........",
        ]);
        let regions = external_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 35);
        assert_eq!((regions[0].width, regions[0].height), (7, 5));
    }

    #[test]
    fn doubly_nested_rings() {
        let mask = mask_from(&[
            "#########",
            "#.......#",
            "#.#####.#",
            "#.#...#.#",
            "#.#.#.#.#",
            "#.#...#.#",
            "#.#####.#",
            "#.......#",
            "#########",
        ]);
        let regions = external_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 81);
    }

    #[test]
    fn min_area_is_strict() {
        let mask = mask_from(&["###.", "###.", "....", "...."]);
        assert!(RegionSelector::with_min_area(6).select(&mask).is_none());
        assert_eq!(RegionSelector::with_min_area(5).select(&mask).unwrap().area, 6);
    }
}
