//! Generators for synthetic alert pixels and tile images.
//!
//! Pixels are built from raw channel components (days since the encoding
//! epoch and the blue-band code) so tests exercise the decoder against data
//! shaped the way the tile origin packs it.

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

/// Pack a day count and blue-band code into an opaque RGBA pixel.
///
/// `total_days` is split as `r * 255 + g`.
///
/// # Example
///
/// ```
/// use test_utils::alert_pixel;
///
/// assert_eq!(alert_pixel(365, 203), [1, 110, 203, 255]);
/// ```
pub fn alert_pixel(total_days: u32, band3: u8) -> [u8; 4] {
    assert!(total_days < 256 * 255, "total_days out of channel range");
    [(total_days / 255) as u8, (total_days % 255) as u8, band3, 255]
}

/// Days since the encoding epoch for an alert date value (`yy * 1000 + day`).
pub fn total_days_for(date_value: u32) -> u32 {
    (date_value / 1000 - 15) * 365 + date_value % 1000
}

/// Flatten pixels into an RGBA byte buffer.
pub fn rgba_buffer(pixels: &[[u8; 4]]) -> Vec<u8> {
    pixels.iter().flat_map(|p| p.iter().copied()).collect()
}

/// A `width x height` buffer filled with one pixel value.
pub fn uniform_buffer(width: usize, height: usize, pixel: [u8; 4]) -> Vec<u8> {
    rgba_buffer(&vec![pixel; width * height])
}

/// A tile buffer whose rows cycle through `dates` (one date per row).
///
/// Every pixel is confirmed (`band3 = 2xx`) with raw intensity 5.
pub fn striped_alert_buffer(width: usize, height: usize, dates: &[u32]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height);
    for row in 0..height {
        let date = dates[row % dates.len()];
        let pixel = alert_pixel(total_days_for(date), 205);
        pixels.extend(std::iter::repeat(pixel).take(width));
    }
    rgba_buffer(&pixels)
}

/// Encode an RGBA buffer as PNG bytes, as the tile origin would serve it.
pub fn png_tile(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ColorType::Rgba8)
        .expect("encode synthetic PNG tile");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_days_for() {
        assert_eq!(total_days_for(15000), 0);
        assert_eq!(total_days_for(15001), 1);
        assert_eq!(total_days_for(16000), 365);
        assert_eq!(total_days_for(17003), 733);
    }

    #[test]
    fn test_striped_buffer_layout() {
        let buf = striped_alert_buffer(3, 2, &[15000, 16000]);
        assert_eq!(buf.len(), 3 * 2 * 4);
        assert_eq!(&buf[0..4], &[0, 0, 205, 255]);
        assert_eq!(&buf[12..16], &[1, 110, 205, 255]);
    }

    #[test]
    fn test_png_tile_signature() {
        let png = png_tile(2, 2, &uniform_buffer(2, 2, [1, 2, 3, 4]));
        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }
}
