//! Identifier and fixed-point value types shared across the catalog.
//!
//! Identifiers are opaque tokens (UUIDv4 strings when generated by the
//! service, arbitrary strings when supplied by an importer). Prices carry
//! exactly two fractional digits; parsing rounds half away from zero once,
//! so `"15.50343"` becomes `15.50` everywhere it is observed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

const PRICE_SCALE: u32 = 2;
const DISCOUNT_SCALE: u32 = 2;
const DISCOUNT_MAX_HUNDREDTHS: u32 = 100 * 100;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Fresh identifier for rows created without a caller-supplied id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a top-level menu.
    MenuId
);
string_id!(
    /// Identifier of a submenu, unique across all menus.
    SubmenuId
);
string_id!(
    /// Identifier of a dish, unique across all submenus.
    DishId
);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecimalError {
    #[error("decimal value is empty")]
    Empty,
    #[error("`{input}` is not a decimal number")]
    Malformed { input: String },
    #[error("`{input}` is out of range")]
    OutOfRange { input: String },
}

/// Parse a plain decimal literal into an integer scaled by `10^scale`,
/// rounding half away from zero on the first dropped digit.
fn parse_scaled(input: &str, scale: u32) -> Result<i64, DecimalError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecimalError::Empty);
    }

    let malformed = || DecimalError::Malformed {
        input: input.to_string(),
    };
    let out_of_range = || DecimalError::OutOfRange {
        input: input.to_string(),
    };

    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let factor = 10_i64.pow(scale);
    let mut value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().map_err(|_| out_of_range())?
    };
    value = value.checked_mul(factor).ok_or_else(out_of_range)?;

    let mut kept = 0_i64;
    let mut fraction_digits = fraction.bytes();
    for position in 0..scale {
        let digit = fraction_digits.next().map_or(0, |b| i64::from(b - b'0'));
        kept += digit * 10_i64.pow(scale - 1 - position);
    }
    value = value.checked_add(kept).ok_or_else(out_of_range)?;

    if fraction_digits.next().is_some_and(|b| b >= b'5') {
        value = value.checked_add(1).ok_or_else(out_of_range)?;
    }

    Ok(if negative { -value } else { value })
}

fn format_scaled(value: i64, scale: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let factor = 10_u64.pow(scale);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    write!(
        f,
        "{sign}{}.{:0width$}",
        magnitude / factor,
        magnitude % factor,
        width = scale as usize
    )
}

/// Fixed-point price with a scale of two, stored as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: i64,
}

impl Price {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }

    /// Price after subtracting `discount` percent, rounded to the cent.
    pub fn discounted(self, discount: Discount) -> Self {
        let remaining = i128::from(DISCOUNT_MAX_HUNDREDTHS - discount.hundredths());
        let scaled = i128::from(self.cents) * remaining;
        let divisor = i128::from(DISCOUNT_MAX_HUNDREDTHS);
        let half = divisor / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / divisor
        } else {
            (scaled - half) / divisor
        };
        // |rounded| <= |cents|, so the narrowing is lossless.
        Self {
            cents: rounded as i64,
        }
    }
}

impl FromStr for Price {
    type Err = DecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_scaled(input, PRICE_SCALE).map(Self::from_cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(self.cents, PRICE_SCALE, f)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Discount percentage in `[0, 100]`, kept to hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discount {
    hundredths: u32,
}

impl Discount {
    pub fn from_hundredths(hundredths: u32) -> Result<Self, DecimalError> {
        if hundredths > DISCOUNT_MAX_HUNDREDTHS {
            return Err(DecimalError::OutOfRange {
                input: hundredths.to_string(),
            });
        }
        Ok(Self { hundredths })
    }

    pub const fn hundredths(self) -> u32 {
        self.hundredths
    }

    pub const fn is_zero(self) -> bool {
        self.hundredths == 0
    }
}

impl FromStr for Discount {
    type Err = DecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let scaled = parse_scaled(input, DISCOUNT_SCALE)?;
        let hundredths = u32::try_from(scaled).map_err(|_| DecimalError::OutOfRange {
            input: input.to_string(),
        })?;
        Self::from_hundredths(hundredths).map_err(|_| DecimalError::OutOfRange {
            input: input.to_string(),
        })
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(i64::from(self.hundredths), DISCOUNT_SCALE, f)
    }
}

impl Serialize for Discount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Discount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
