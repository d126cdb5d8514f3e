//! Binary opening with a square neighborhood.
//!
//! Pixels outside the frame are ignored rather than treated
//! as background, so erosion does not eat into blobs that
//! touch the frame edge.
use imageproc::{distance_transform::Norm, morphology};

use crate::frame::{image_mask, mask_image, Mask};

/// Erosion followed by dilation over a `size`×`size` square:
/// removes foreground specks smaller than the neighborhood
/// and keeps larger blobs.
pub fn open(mask: &Mask, size: usize) -> Mask {
    let reach = size / 2;
    if reach == 0 {
        return mask.clone();
    }
    // A chessboard ball of radius `reach` is the square.
    let radius = reach.min(u8::MAX as usize) as u8;
    image_mask(&morphology::open(&mask_image(mask), Norm::LInf, radius))
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn square(dim: (usize, usize), top: usize, left: usize, side: usize) -> Mask {
        Array2::from_shape_fn(dim, |(r, c)| {
            r >= top && r < top + side && c >= left && c < left + side
        })
    }

    #[test]
    fn opening_removes_specks_and_keeps_blobs() {
        let mut mask = square((20, 20), 5, 5, 6);
        mask[[1, 15]] = true;
        mask[[18, 2]] = true;

        let opened = open(&mask, 3);
        assert_eq!(opened, square((20, 20), 5, 5, 6));
    }

    #[test]
    fn edge_blobs_survive() {
        let mask = square((10, 10), 0, 0, 4);
        assert_eq!(open(&mask, 3), mask);
    }

    #[test]
    fn thin_lines_are_removed() {
        let mask = Array2::from_shape_fn((10, 10), |(_, c)| c == 4 || c == 5);
        assert!(!open(&mask, 3).iter().any(|&v| v));
        assert_eq!(open(&mask, 1), mask);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mask = Array2::from_shape_fn((5, 5), |(r, c)| (r + c) % 2 == 0);
        assert_eq!(open(&mask, 1), mask);
    }
}
