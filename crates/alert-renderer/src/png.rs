//! PNG handling for alert tiles.
//!
//! Decoding turns the bytes served by the tile origin into an RGBA raster
//! via the `image` crate. Encoding writes RGBA colour type 6 directly
//! (deflate + CRC) and is used for surface snapshots.

use std::io::Write;

use image::ImageFormat;
use thiserror::Error;

/// PNG file signature
const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

#[derive(Debug, Error)]
pub enum PngError {
    #[error("Tile image decode failed: {0}")]
    Decode(String),

    #[error("Pixel buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("IDAT compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// A decoded tile raster (RGBA, 4 bytes per pixel, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode PNG bytes into an RGBA raster, whatever the source colour type.
pub fn decode_png(bytes: &[u8]) -> Result<TileImage, PngError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| PngError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TileImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Encode an RGBA buffer as a PNG (colour type 6, no filtering).
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PngError> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(PngError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }

    let mut png = Vec::with_capacity(expected / 4 + 64);
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type (RGBA)
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr);

    let idat = deflate_scanlines(pixels, width as usize, height as usize)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    let stride = width * 4;
    let mut raw = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride.max(1)).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}
