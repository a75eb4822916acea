use core::fmt;

use serde::{Deserialize, Serialize};

/// Signed fixed-point value in hundredths, the decimal unit carried on the
/// wire for temperature and humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Centi(i32);

impl Centi {
    pub const ZERO: Self = Self(0);

    pub fn from_hundredths(hundredths: i32) -> Self {
        Self(hundredths)
    }

    /// Builds a value from a signed whole part and a fractional part in
    /// hundredths. The sign of `whole` covers the whole value, so `-5` with
    /// `25` is -5.25; values between -1 and 0 need `from_hundredths`.
    pub fn from_parts(whole: i32, hundredths: u8) -> Self {
        let frac = i32::from(hundredths % 100);
        if whole < 0 {
            Self(whole * 100 - frac)
        } else {
            Self(whole * 100 + frac)
        }
    }

    /// Decodes a DS18B20 temperature word: sixteenths of a degree in
    /// two's complement.
    pub fn from_raw_sixteenths(raw: i16) -> Self {
        let magnitude = i32::from(raw).unsigned_abs();
        let whole = magnitude >> 4;
        let frac = (magnitude & 0xf) * 100 / 16;
        let hundredths = (whole * 100 + frac) as i32;
        if raw < 0 { Self(-hundredths) } else { Self(hundredths) }
    }

    /// Converts a float reading to the nearest hundredth. Rounding matters:
    /// many exact hundredths land just below the integer as f32 products.
    pub fn from_celsius(value: f32) -> Self {
        Self(libm::roundf(value * 100.0) as i32)
    }

    pub fn hundredths_total(&self) -> i32 {
        self.0
    }

    pub fn whole(&self) -> i32 {
        self.0 / 100
    }

    pub fn hundredths(&self) -> u8 {
        (self.0 % 100).unsigned_abs() as u8
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-")?;
        }
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}.{:02}", magnitude / 100, magnitude % 100)
    }
}
