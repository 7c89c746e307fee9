//! The drawing surface tiles are composited onto.
//!
//! One surface exists per layer, sized to the host viewport. Tiles draw at
//! signed screen positions and are clipped to the surface; read-back and
//! write-back operate on the clipped rectangle only.

use thiserror::Error;

use crate::png::{encode_png, PngError};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Region {rect:?} lies outside the {width}x{height} surface")]
    OutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },

    #[error("Region data is {actual} bytes, expected {expected}")]
    DataSize { expected: usize, actual: usize },

    #[error(transparent)]
    Png(#[from] PngError),
}

/// A rectangle of surface pixels, already clipped to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// An RGBA drawing surface.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// A fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Resize to a new viewport, discarding content.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize * 4, 0);
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Clip a `width x height` rectangle at a signed screen position.
    ///
    /// Returns `None` when nothing of it lands on the surface.
    pub fn clip(&self, x: i64, y: i64, width: u32, height: u32) -> Option<PixelRect> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width as i64);
        let y1 = (y + height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Copy an RGBA image onto the surface with its top-left at `(x, y)`.
    ///
    /// Destination pixels are replaced. Returns the clipped rectangle that
    /// was written, or `None` if the image is entirely off-surface.
    pub fn draw_rgba(
        &mut self,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        image: &[u8],
    ) -> Result<Option<PixelRect>, SurfaceError> {
        let expected = width as usize * height as usize * 4;
        if image.len() != expected {
            return Err(SurfaceError::DataSize {
                expected,
                actual: image.len(),
            });
        }
        let Some(rect) = self.clip(x, y, width, height) else {
            return Ok(None);
        };

        // Offset of the visible part inside the source image
        let src_x = (rect.x as i64 - x) as usize;
        let src_y = (rect.y as i64 - y) as usize;
        let row_bytes = rect.width as usize * 4;
        let src_stride = width as usize * 4;

        for row in 0..rect.height as usize {
            let src = (src_y + row) * src_stride + src_x * 4;
            let dst = self.offset(rect.x, rect.y + row as u32);
            self.pixels[dst..dst + row_bytes].copy_from_slice(&image[src..src + row_bytes]);
        }
        Ok(Some(rect))
    }

    /// Copy a rectangle of surface pixels out (row-major RGBA).
    pub fn read_region(&self, rect: PixelRect) -> Result<Vec<u8>, SurfaceError> {
        self.check_bounds(rect)?;
        let row_bytes = rect.width as usize * 4;
        let mut out = Vec::with_capacity(rect.byte_len());
        for row in 0..rect.height {
            let start = self.offset(rect.x, rect.y + row);
            out.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        Ok(out)
    }

    /// Write a rectangle of pixels back, replacing what is there.
    pub fn write_region(&mut self, rect: PixelRect, data: &[u8]) -> Result<(), SurfaceError> {
        self.check_bounds(rect)?;
        if data.len() != rect.byte_len() {
            return Err(SurfaceError::DataSize {
                expected: rect.byte_len(),
                actual: data.len(),
            });
        }
        let row_bytes = rect.width as usize * 4;
        for (row, src) in data.chunks_exact(row_bytes.max(1)).enumerate() {
            let start = self.offset(rect.x, rect.y + row as u32);
            self.pixels[start..start + row_bytes].copy_from_slice(src);
        }
        Ok(())
    }

    /// Snapshot the surface as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, SurfaceError> {
        Ok(encode_png(&self.pixels, self.width, self.height)?)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn check_bounds(&self, rect: PixelRect) -> Result<(), SurfaceError> {
        let fits = rect.x as u64 + rect.width as u64 <= self.width as u64
            && rect.y as u64 + rect.height as u64 <= self.height as u64;
        if fits {
            Ok(())
        } else {
            Err(SurfaceError::OutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            })
        }
    }
}
