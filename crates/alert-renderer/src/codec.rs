//! Alert pixel encoding.
//!
//! Each tile pixel packs three values into its colour channels:
//!
//! - `r * 255 + g`: days since the encoding epoch, in 365-day years
//! - `b` as a three-digit decimal `CII`: confidence class `C` (1 provisional,
//!   2 confirmed) and raw intensity `II`
//!
//! Alpha is not part of the encoding. Decoding is lossy (intensity is
//! scaled and clamped) and must be redone from the raw channels on every
//! draw.

use thiserror::Error;

/// Year offset of day zero. Offset 15 with a `* 1000` date layout puts the
/// epoch at date value 15000.
pub const YEAR_OFFSET_BASE: u32 = 15;

/// Days per encoded year. Leap days are not represented.
pub const DAYS_PER_YEAR: u32 = 365;

/// Alpha units per raw intensity step.
pub const INTENSITY_SCALE: u32 = 50;

/// Largest day count the red/green pair can carry.
const MAX_TOTAL_DAYS: u32 = 255 * 255 + 254;

/// Semantic content of one alert pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPixel {
    /// `year_offset * 1000 + day_of_year`
    pub date: u32,
    /// 0 = provisional, 1 = confirmed
    pub confidence: u8,
    /// Display alpha derived from the raw intensity, clamped to 255
    pub intensity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("band3 code {band3:03} has no valid confidence class")]
    InvalidConfidenceClass { band3: u8 },

    #[error("date value {0} is outside the encodable range")]
    DateOutOfRange(u32),

    #[error("confidence must be 0 or 1, got {0}")]
    InvalidConfidence(u8),

    #[error("raw intensity {raw} does not fit the band3 code for confidence {confidence}")]
    IntensityOutOfRange { confidence: u8, raw: u8 },
}

/// Decode a pixel. Fails when the blue band's class digit is not 1 or 2.
#[inline]
pub fn decode(pixel: [u8; 4]) -> Result<DecodedPixel, CodecError> {
    let [r, g, b, _] = pixel;

    let total_days = r as u32 * 255 + g as u32;
    let year = (total_days / DAYS_PER_YEAR + YEAR_OFFSET_BASE) * 1000;
    let date = year + total_days % DAYS_PER_YEAR;

    // Digits of the zero-padded code: class is the hundreds digit.
    // Codes below 100 would give confidence -1 under a literal reading of
    // the format; they are treated as corrupt and rejected instead.
    let class = b / 100;
    if !(1..=2).contains(&class) {
        return Err(CodecError::InvalidConfidenceClass { band3: b });
    }
    let raw_intensity = (b % 100) as u32;

    Ok(DecodedPixel {
        date,
        confidence: class - 1,
        intensity: (raw_intensity * INTENSITY_SCALE).min(255) as u8,
    })
}

/// Decode outcome that separates background pixels from corrupt ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    /// Blue code 0: no detection at this pixel.
    Empty,
    Alert(DecodedPixel),
    Malformed(CodecError),
}

/// Classify a pixel without failing.
#[inline]
pub fn classify(pixel: [u8; 4]) -> PixelClass {
    if pixel[2] == 0 {
        return PixelClass::Empty;
    }
    match decode(pixel) {
        Ok(decoded) => PixelClass::Alert(decoded),
        Err(e) => PixelClass::Malformed(e),
    }
}

/// Encode an alert the way the tile origin does. Alpha is set opaque.
///
/// `raw_intensity` is the two-digit value stored in the blue band, not the
/// decoded alpha.
pub fn encode(date: u32, confidence: u8, raw_intensity: u8) -> Result<[u8; 4], CodecError> {
    let year_offset = date / 1000;
    let day = date % 1000;
    if year_offset < YEAR_OFFSET_BASE || day >= DAYS_PER_YEAR {
        return Err(CodecError::DateOutOfRange(date));
    }
    let total_days = (year_offset - YEAR_OFFSET_BASE)
        .checked_mul(DAYS_PER_YEAR)
        .and_then(|d| d.checked_add(day))
        .filter(|d| *d <= MAX_TOTAL_DAYS)
        .ok_or(CodecError::DateOutOfRange(date))?;

    if confidence > 1 {
        return Err(CodecError::InvalidConfidence(confidence));
    }
    let band3 = (confidence as u32 + 1) * 100 + raw_intensity as u32;
    if raw_intensity >= 100 || band3 > 255 {
        return Err(CodecError::IntensityOutOfRange {
            confidence,
            raw: raw_intensity,
        });
    }

    Ok([
        (total_days / 255) as u8,
        (total_days % 255) as u8,
        band3 as u8,
        255,
    ])
}
