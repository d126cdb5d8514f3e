use std::path::Path;

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayBase, Data, Ix2};

use crate::error::{MeasureError, Result};

/// Single-channel intensity frame, indexed `(row, col)`.
pub type GrayFrame = Array2<u8>;

/// Three-channel frame. Pixels are `[r, g, b]` as decoded,
/// or `[h, s, v]` after [`to_hsv`][crate::color::to_hsv].
pub type ColorFrame = Array2<[u8; 3]>;

/// Foreground (`true`) / background classification with the
/// extent of the frame it was derived from.
pub type Mask = Array2<bool>;

/// Decodes a frame to 8-bit intensity. Colour frames are
/// reduced with the `image` crate's Rec. 709 luma weights.
pub fn read_gray(path: &Path) -> Result<GrayFrame> {
    let image = open(path)?.to_luma8();
    let (width, height) = image.dimensions();
    Ok(Array2::from_shape_vec(
        (height as usize, width as usize),
        image.into_raw(),
    )?)
}

pub fn read_color(path: &Path) -> Result<ColorFrame> {
    let image = open(path)?.to_rgb8();
    let (width, height) = image.dimensions();
    let pixels: Vec<[u8; 3]> = image
        .into_raw()
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    Ok(Array2::from_shape_vec(
        (height as usize, width as usize),
        pixels,
    )?)
}

fn open(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).map_err(|source| MeasureError::FrameRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Copies an intensity frame (or a view of one) into an
/// `image` buffer.
pub fn gray_image<S: Data<Elem = u8>>(frame: &ArrayBase<S, Ix2>) -> GrayImage {
    let (rows, cols) = frame.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([frame[[y as usize, x as usize]]])
    })
}

/// Foreground as 255, background as 0.
pub fn mask_image(mask: &Mask) -> GrayImage {
    let (rows, cols) = mask.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([if mask[[y as usize, x as usize]] { 255 } else { 0 }])
    })
}

/// Non-zero pixels are foreground.
pub fn image_mask(image: &GrayImage) -> Mask {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        image.get_pixel(col as u32, row as u32)[0] != 0
    })
}

/// Number of foreground pixels.
pub fn count(mask: &Mask) -> usize {
    mask.iter().filter(|&&v| v).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_gray(Path::new("/nonexistent/Img000000.tif")).unwrap_err();
        assert!(err.is_read_error());
        assert!(matches!(err, MeasureError::FrameRead { .. }));
    }

    #[test]
    fn mask_survives_image_conversion() {
        let mask = Array2::from_shape_fn((3, 5), |(r, c)| r + c == 4);
        let image = mask_image(&mask);
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(4, 0)[0], 255);
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image_mask(&image), mask);
    }

    #[test]
    fn counts_foreground() {
        let mask = Array2::from_shape_fn((4, 5), |(r, c)| r == c);
        assert_eq!(count(&mask), 4);
    }
}
