//! Date-range filtering of alert tile pixels.
//!
//! Every pixel is handled in isolation: decode, test against the
//! [`FilterState`], then rewrite alpha. In the default mode RGB is never
//! touched, so filtering the same buffer twice leaves colour intact.

use rayon::prelude::*;

use crate::codec::{classify, PixelClass};

/// Minimum pixels to benefit from parallel filtering
const PARALLEL_THRESHOLD: usize = 16384; // 128x128 or larger

/// How visible pixels are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Keep the tile's colour; alpha carries the detection intensity.
    #[default]
    Intensity,
    /// Replace colour by confidence class; alpha still carries intensity.
    Recolor {
        provisional: [u8; 3],
        confirmed: [u8; 3],
    },
}

/// Per-pixel visibility predicate, owned by the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    /// Inclusive lower date bound (`yy * 1000 + day`)
    pub min_date: u32,
    /// Inclusive upper date bound
    pub max_date: u32,
    /// Hide provisional (confidence 0) detections
    pub confirmed_only: bool,
    pub mode: FilterMode,
}

impl FilterState {
    pub fn new(min_date: u32, max_date: u32) -> Self {
        Self {
            min_date,
            max_date,
            confirmed_only: false,
            mode: FilterMode::Intensity,
        }
    }

    /// Whether a decoded date falls inside the inclusive range.
    #[inline]
    pub fn contains(&self, date: u32) -> bool {
        self.min_date <= date && date <= self.max_date
    }
}

/// Pixel counts from one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub visible: usize,
    pub hidden: usize,
    /// Background pixels with no detection
    pub empty: usize,
    /// Pixels violating the encoding contract (also hidden)
    pub malformed: usize,
}

impl FilterStats {
    pub fn total(&self) -> usize {
        self.visible + self.hidden + self.empty + self.malformed
    }

    fn merge(self, other: FilterStats) -> FilterStats {
        FilterStats {
            visible: self.visible + other.visible,
            hidden: self.hidden + other.hidden,
            empty: self.empty + other.empty,
            malformed: self.malformed + other.malformed,
        }
    }
}

/// Filter an RGBA buffer in place and report what happened.
///
/// Trailing bytes that do not form a whole pixel are left untouched.
pub fn filter_buffer(pixels: &mut [u8], state: &FilterState) -> FilterStats {
    let num_pixels = pixels.len() / 4;

    if num_pixels < PARALLEL_THRESHOLD {
        return filter_chunk(pixels, state);
    }

    let chunk_size = (num_pixels / rayon::current_num_threads()).max(256) * 4;
    pixels
        .par_chunks_mut(chunk_size)
        .map(|chunk| filter_chunk(chunk, state))
        .reduce(FilterStats::default, FilterStats::merge)
}

fn filter_chunk(pixels: &mut [u8], state: &FilterState) -> FilterStats {
    let mut stats = FilterStats::default();
    for px in pixels.chunks_exact_mut(4) {
        match classify([px[0], px[1], px[2], px[3]]) {
            PixelClass::Alert(decoded) => {
                let shown =
                    state.contains(decoded.date) && !(state.confirmed_only && decoded.confidence == 0);
                if shown {
                    if let FilterMode::Recolor {
                        provisional,
                        confirmed,
                    } = state.mode
                    {
                        let rgb = if decoded.confidence == 1 {
                            confirmed
                        } else {
                            provisional
                        };
                        px[..3].copy_from_slice(&rgb);
                    }
                    px[3] = decoded.intensity;
                    stats.visible += 1;
                } else {
                    px[3] = 0;
                    stats.hidden += 1;
                }
            }
            PixelClass::Empty => {
                px[3] = 0;
                stats.empty += 1;
            }
            PixelClass::Malformed(_) => {
                px[3] = 0;
                stats.malformed += 1;
            }
        }
    }
    stats
}
