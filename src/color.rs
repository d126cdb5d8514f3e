//! RGB to HSV conversion on the 8-bit OpenCV scale.
//!
//! Hue is halved to fit a byte (`0..180`), saturation and
//! value span `0..=255`. Colour band bounds in
//! [`FlameConfig`][crate::config::FlameConfig] are expressed
//! on this scale.
use palette::{FromColor, Hsv, Srgb};

use crate::frame::ColorFrame;

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());

    let h = (hsv.hue.to_positive_degrees() / 2.).round() as u16 % 180;
    let s = (hsv.saturation * 255.).round() as u8;
    let v = (hsv.value * 255.).round() as u8;
    [h as u8, s, v]
}

pub fn to_hsv(frame: &ColorFrame) -> ColorFrame {
    frame.map(|&p| rgb_to_hsv(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 255, 0]), [30, 255, 255]);
    }

    #[test]
    fn flame_colours_land_in_default_bands() {
        let config = crate::config::FlameConfig::default();
        let (yellow, blue) = (&config.bands[0], &config.bands[1]);

        let flame = rgb_to_hsv([255, 200, 0]);
        assert_eq!(flame, [24, 255, 255]);
        assert!(yellow.contains(flame) && !blue.contains(flame));

        let base = rgb_to_hsv([30, 60, 200]);
        assert_eq!(base, [115, 217, 200]);
        assert!(blue.contains(base) && !yellow.contains(base));
    }

    #[test]
    fn grays_have_no_hue() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn hue_wraps_below_180() {
        // Magenta-red just short of a full turn.
        let [h, _, _] = rgb_to_hsv([255, 0, 1]);
        assert!(h < 180);
        assert_eq!(h, 0);
    }
}
