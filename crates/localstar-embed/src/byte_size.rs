//! Human-readable byte sizes
//!
//! Parses and formats quantities like `"1.5MB"` or `"20 kb"`. Units are
//! binary (1 KB = 1024 bytes) and case-insensitive; a missing unit means
//! bytes.

use regex::Regex;
use std::sync::LazyLock;

/// Multipliers for each unit letter, largest last.
const UNITS: [(char, u64); 6] = [
    ('B', 1),
    ('K', 1 << 10),
    ('M', 1 << 20),
    ('G', 1 << 30),
    ('T', 1 << 40),
    ('P', 1 << 50),
];

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([KMGTP]?B?)?$").expect("byte size pattern is valid")
});

static UNIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([KMGTP]?B?)$").expect("unit pattern is valid"));

/// Errors from parsing or formatting byte sizes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ByteSizeError {
    #[error("Didn't recognize {0:?} as a byte size")]
    Unrecognized(String),

    #[error("Didn't recognize unit {0:?}")]
    UnknownUnit(String),

    #[error("Byte size {0:?} does not fit in 64 bits")]
    Overflow(String),
}

/// Options for [`format_byte_size`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions<'a> {
    /// Fixed unit to render in, e.g. `"M"` or `" KB"`. Leading text is kept
    /// verbatim; only the trailing `[KMGTP]?B?` picks the multiplier.
    pub unit: Option<&'a str>,

    /// Digits after the decimal point. Defaults to 2, with an all-zero
    /// fraction trimmed when unset.
    pub decimals: Option<usize>,
}

fn multiplier(letter: char) -> Option<u64> {
    let letter = letter.to_ascii_uppercase();
    UNITS.iter().find(|(c, _)| *c == letter).map(|(_, m)| *m)
}

/// Parse a human-readable size into bytes, rounding down.
pub fn parse_byte_size(human: &str) -> Result<u64, ByteSizeError> {
    let caps = SIZE_PATTERN
        .captures(human.trim())
        .ok_or_else(|| ByteSizeError::Unrecognized(human.to_string()))?;

    let number: f64 = caps[1]
        .parse()
        .map_err(|_| ByteSizeError::Unrecognized(human.to_string()))?;
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let letter = unit.chars().next().unwrap_or('B');
    let mult = multiplier(letter).ok_or_else(|| ByteSizeError::UnknownUnit(unit.to_string()))?;

    let bytes = (number * mult as f64).floor();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(ByteSizeError::Overflow(human.to_string()));
    }
    Ok(bytes as u64)
}

/// Format a byte count for humans.
pub fn format_byte_size(size: u64, options: FormatOptions<'_>) -> Result<String, ByteSizeError> {
    let (letter, unit) = match options.unit {
        Some(unit) => {
            let suffix = UNIT_SUFFIX
                .captures(unit)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or("");
            let letter = suffix
                .chars()
                .next()
                .ok_or_else(|| ByteSizeError::UnknownUnit(unit.to_string()))?
                .to_ascii_uppercase();
            (letter, unit.to_string())
        }
        None => {
            let (letter, _) = UNITS
                .iter()
                .rev()
                .find(|(_, m)| size >= *m)
                .copied()
                .unwrap_or(('B', 1));
            let unit = if letter == 'B' {
                "b".to_string()
            } else {
                format!("{}b", letter.to_ascii_lowercase())
            };
            (letter, unit)
        }
    };

    let mult = multiplier(letter).ok_or_else(|| ByteSizeError::UnknownUnit(unit.clone()))?;
    let mut value = format!("{:.*}", options.decimals.unwrap_or(2), size as f64 / mult as f64);
    if options.decimals.unwrap_or(0) == 0 || letter == 'B' {
        if let Some((whole, fraction)) = value.split_once('.') {
            if fraction.chars().all(|c| c == '0') {
                value = whole.to_string();
            }
        }
    }
    Ok(format!("{}{}", value, unit))
}

/// Format with an inferred unit and default precision.
pub fn to_human(size: u64) -> String {
    format_byte_size(size, FormatOptions::default()).unwrap_or_else(|_| format!("{}b", size))
}
