//! Client-side interpretation of alert tiles.
//!
//! - Pixel codec: raw RGBA channels to date / confidence / intensity
//! - Filter pipeline: date-range visibility mask written into alpha
//! - Drawing surface: the RGBA buffer tiles are composited onto
//! - PNG decode of fetched tiles and encode of surface snapshots

pub mod codec;
pub mod filter;
pub mod png;
pub mod surface;

pub use codec::{classify, decode, encode, CodecError, DecodedPixel, PixelClass};
pub use filter::{filter_buffer, FilterMode, FilterState, FilterStats};
pub use png::{decode_png, encode_png, PngError, TileImage};
pub use surface::{PixelRect, Surface, SurfaceError};
